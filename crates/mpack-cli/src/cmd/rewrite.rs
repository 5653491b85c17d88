// crates/mpack-cli/src/cmd/rewrite.rs
//
// The interoperability gate: every value on stdin is decoded and
// re-encoded with the minimal-width encoder. Exit 0 means the input was a
// clean sequence of complete values.

use std::io::{self, BufWriter, Read, Write};

use clap::Args;
use mpack_core::{pack, Header, Kind, UnpackStream, MIN_REFILL};

#[derive(Args)]
pub struct RewriteArgs {
    /// Refill buffer size in bytes (minimum 8; one page is plenty).
    #[arg(long, default_value_t = 4096)]
    pub buf: usize,
}

pub fn run(args: RewriteArgs) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut src = stdin.lock();
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());

    let mut buf = vec![0u8; args.buf.max(MIN_REFILL)];
    let mut un = UnpackStream::new(&mut buf);

    let mut values = 0u64;
    while let Some(header) = un.next(&mut src)? {
        rewrite_value(&mut un, &mut src, &mut out, &header)?;
        values += 1;
    }
    out.flush()?;

    log::debug!(
        "rewrote {values} top-level values from {} source bytes",
        un.bytes_read()
    );
    Ok(())
}

fn rewrite_value<R: Read, W: Write>(
    un: &mut UnpackStream<'_>,
    src: &mut R,
    out: &mut W,
    header: &Header,
) -> anyhow::Result<()> {
    match header.kind {
        Kind::Nil => {
            un.as_nil(src, header)?;
            pack::write_nil(out)?;
        }
        Kind::Bool(_) => {
            let v = un.as_bool(src, header)?;
            pack::write_bool(out, v)?;
        }
        Kind::PosFixint(_) | Kind::Uint8 | Kind::Uint16 | Kind::Uint32 | Kind::Uint64 => {
            let v: u64 = un.as_int(src, header)?;
            pack::write_uint(out, v)?;
        }
        Kind::NegFixint(_) | Kind::Int8 | Kind::Int16 | Kind::Int32 | Kind::Int64 => {
            let v: i64 = un.as_int(src, header)?;
            pack::write_int(out, v)?;
        }
        Kind::Float32 | Kind::Float64 => {
            let v: f64 = un.as_float(src, header)?;
            pack::write_float(out, v)?;
        }
        Kind::FixStr(_) | Kind::Str8 | Kind::Str16 | Kind::Str32 => {
            pack::write_str_len(out, header.size as usize)?;
            let mut reader = un.raw_reader(src, header)?;
            io::copy(&mut reader, out)?;
        }
        Kind::Bin8 | Kind::Bin16 | Kind::Bin32 => {
            pack::write_bin_len(out, header.size as usize)?;
            let mut reader = un.raw_reader(src, header)?;
            io::copy(&mut reader, out)?;
        }
        Kind::FixExt1
        | Kind::FixExt2
        | Kind::FixExt4
        | Kind::FixExt8
        | Kind::FixExt16
        | Kind::Ext8
        | Kind::Ext16
        | Kind::Ext32 => {
            pack::write_ext_len(out, header.size as usize, header.ext_type.unwrap_or(0))?;
            let mut reader = un.raw_reader(src, header)?;
            io::copy(&mut reader, out)?;
        }
        Kind::FixArray(_) | Kind::Array16 | Kind::Array32 => {
            pack::write_array_len(out, header.size as usize)?;
            let mut cur = un.open_array(header)?;
            while let Some(child) = cur.next(src)? {
                rewrite_value(cur.stream(), src, out, &child)?;
            }
        }
        Kind::FixMap(_) | Kind::Map16 | Kind::Map32 => {
            pack::write_map_len(out, header.size as usize)?;
            let mut cur = un.open_map(header)?;
            while let Some(child) = cur.next(src)? {
                rewrite_value(cur.stream(), src, out, &child)?;
            }
        }
    }
    Ok(())
}
