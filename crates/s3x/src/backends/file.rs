//! 📂 Previously, on "Things That Could Go Wrong With A Directory"...
//!
//! Someone synced half a bucket to their laptop and asked: "can I grep it
//! the same way?" Yes. Each subdirectory of `root` is a bucket, each file
//! under it is an object, and its `/`-joined relative path is the key.
//!
//! 🗂️ Listing walks the bucket, sorts keys, and pages through them with
//! start-after semantics (the cursor is the last key handed out).
//! 📖 Fetching streams the file in fixed-size chunks via `ReaderStream`.
//! 🦆 (mandatory, no notes)

mod file_store;

pub use file_store::{FileStore, FileStoreConfig};
