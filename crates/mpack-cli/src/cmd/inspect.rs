// crates/mpack-cli/src/cmd/inspect.rs
//
// Human-readable dump: one line per value, children indented under their
// container, payloads echoed up to a cap (text for str, hex for bin/ext).

use std::io::{self, Read, Write};

use clap::Args;
use mpack_core::{Header, Kind, UnpackStream, MIN_REFILL};

#[derive(Args)]
pub struct InspectArgs {
    /// Refill buffer size in bytes (minimum 8).
    #[arg(long, default_value_t = 4096)]
    pub buf: usize,

    /// Payload bytes echoed per value before truncating with "..".
    #[arg(long, default_value_t = 32)]
    pub max_bytes: usize,
}

pub fn run(args: InspectArgs) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let mut src = stdin.lock();
    let stdout = io::stdout();
    let mut out = stdout.lock();

    let mut buf = vec![0u8; args.buf.max(MIN_REFILL)];
    let mut un = UnpackStream::new(&mut buf);

    let mut values = 0u64;
    while let Some(header) = un.next(&mut src)? {
        inspect_value(&mut un, &mut src, &mut out, &header, 0, args.max_bytes)?;
        values += 1;
    }
    log::info!("{values} top-level values, {} bytes", un.bytes_read());
    Ok(())
}

/// Read up to `cap` payload bytes for echoing and drain the rest.
fn capped_payload<R: Read>(
    un: &mut UnpackStream<'_>,
    src: &mut R,
    header: &Header,
    cap: usize,
) -> anyhow::Result<(Vec<u8>, bool)> {
    let mut reader = un.raw_reader(src, header)?;
    let mut shown = Vec::with_capacity(cap.min(header.size as usize));
    (&mut reader).take(cap as u64).read_to_end(&mut shown)?;
    let truncated = reader.remaining() > 0;
    io::copy(&mut reader, &mut io::sink())?;
    Ok((shown, truncated))
}

fn inspect_value<R: Read, W: Write>(
    un: &mut UnpackStream<'_>,
    src: &mut R,
    out: &mut W,
    header: &Header,
    depth: usize,
    max_bytes: usize,
) -> anyhow::Result<()> {
    let pad = "  ".repeat(depth);
    match header.kind {
        Kind::Nil => {
            un.as_nil(src, header)?;
            writeln!(out, "{pad}nil")?;
        }
        Kind::Bool(_) => {
            let v = un.as_bool(src, header)?;
            writeln!(out, "{pad}bool {v}")?;
        }
        Kind::PosFixint(_) | Kind::Uint8 | Kind::Uint16 | Kind::Uint32 | Kind::Uint64 => {
            let v: u64 = un.as_int(src, header)?;
            writeln!(out, "{pad}uint {v}")?;
        }
        Kind::NegFixint(_) | Kind::Int8 | Kind::Int16 | Kind::Int32 | Kind::Int64 => {
            let v: i64 = un.as_int(src, header)?;
            writeln!(out, "{pad}int {v}")?;
        }
        Kind::Float32 | Kind::Float64 => {
            let v: f64 = un.as_float(src, header)?;
            writeln!(out, "{pad}float {v}")?;
        }
        Kind::FixStr(_) | Kind::Str8 | Kind::Str16 | Kind::Str32 => {
            let size = header.size;
            let (shown, truncated) = capped_payload(un, src, header, max_bytes)?;
            let text = String::from_utf8_lossy(&shown);
            let ellipsis = if truncated { ".." } else { "" };
            writeln!(out, "{pad}str({size}) \"{text}{ellipsis}\"")?;
        }
        Kind::Bin8 | Kind::Bin16 | Kind::Bin32 => {
            let size = header.size;
            let (shown, truncated) = capped_payload(un, src, header, max_bytes)?;
            let ellipsis = if truncated { ".." } else { "" };
            writeln!(out, "{pad}bin({size}) {}{ellipsis}", hex::encode(shown))?;
        }
        Kind::FixExt1
        | Kind::FixExt2
        | Kind::FixExt4
        | Kind::FixExt8
        | Kind::FixExt16
        | Kind::Ext8
        | Kind::Ext16
        | Kind::Ext32 => {
            let size = header.size;
            let ext_type = header.ext_type.unwrap_or(0);
            let (shown, truncated) = capped_payload(un, src, header, max_bytes)?;
            let ellipsis = if truncated { ".." } else { "" };
            writeln!(
                out,
                "{pad}ext(type={ext_type}, {size}) {}{ellipsis}",
                hex::encode(shown)
            )?;
        }
        Kind::FixArray(_) | Kind::Array16 | Kind::Array32 => {
            writeln!(out, "{pad}array({})", header.size)?;
            let mut cur = un.open_array(header)?;
            while let Some(child) = cur.next(src)? {
                inspect_value(cur.stream(), src, out, &child, depth + 1, max_bytes)?;
            }
        }
        Kind::FixMap(_) | Kind::Map16 | Kind::Map32 => {
            writeln!(out, "{pad}map({})", header.size)?;
            let mut cur = un.open_map(header)?;
            while let Some(child) = cur.next(src)? {
                inspect_value(cur.stream(), src, out, &child, depth + 1, max_bytes)?;
            }
        }
    }
    Ok(())
}
