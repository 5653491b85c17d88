// crates/mpack-ffi/src/lib.rs
//
// ABI-stable descriptor of a buffer-mode unpacker: a pointer to the
// current unread byte plus the remaining length. Field types are exact
// width (`u8` pointee) and `usize` (the platform size type), and the
// struct layout is C. Matching C declaration:
//
//   typedef struct mpack_unpack {
//       const uint8_t *ptr;
//       size_t len;
//   } mpack_unpack;
//
//   mpack_unpack mpack_unpack_init(const uint8_t *ptr, size_t len);
//   void mpack_unpack_set_append(mpack_unpack *un, size_t old_len,
//                                const uint8_t *new_ptr, size_t new_len);

use mpack_core::Unpack;

#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct MpackUnpack {
    pub ptr: *const u8,
    pub len: usize,
}

/// Wrap an existing byte range.
///
/// # Safety contract (C side)
/// `ptr` must point to `len` readable bytes for as long as the descriptor
/// is used.
#[no_mangle]
pub extern "C" fn mpack_unpack_init(ptr: *const u8, len: usize) -> MpackUnpack {
    MpackUnpack { ptr, len }
}

/// Slide the unread window into a re-based buffer after the caller has
/// appended more data. `old_len` is the total length of the buffer the
/// descriptor was last based on; `new_ptr`/`new_len` describe the new
/// buffer, whose first `old_len` bytes are the same logical stream.
///
/// # Safety
/// `un` must be a valid descriptor over the old buffer, `new_ptr` must
/// point to `new_len` readable bytes, and `new_len >= old_len`.
#[no_mangle]
pub unsafe extern "C" fn mpack_unpack_set_append(
    un: *mut MpackUnpack,
    old_len: usize,
    new_ptr: *const u8,
    new_len: usize,
) {
    let window = std::slice::from_raw_parts((*un).ptr, (*un).len);
    let new_view = std::slice::from_raw_parts(new_ptr, new_len);

    let rebased = Unpack::new(window).set_append(old_len, new_view);
    (*un).ptr = rebased.rest().as_ptr();
    (*un).len = rebased.rest().len();
}
