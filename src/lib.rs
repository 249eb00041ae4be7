use std::result;

pub mod error;
pub mod io;

pub mod desc_names;
pub mod mutf8;

pub mod dex;
pub mod file;
pub mod insns;
pub mod render;

pub type Result<T> = result::Result<T, error::DexError>;
