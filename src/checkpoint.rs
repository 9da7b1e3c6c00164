//! Flat parameter buffers on disk.
//!
//! A checkpoint is a 16 byte header (magic, format version and parameter count, the integers
//! big endian) followed by the parameters as raw `f32`s in native byte order.

use std::{fs, path::Path};

use log::debug;

use crate::{MlErr, Result, arch::Model};

const MAGIC: [u8; 4] = *b"CVTP";
const VERSION: u32 = 1;
const HEADER_SIZE: usize = MAGIC.len() + size_of::<u32>() + size_of::<u64>();

/// Writes `params` to `path`, replacing whatever was there.
pub fn save<P: AsRef<Path>>(path: P, params: &[f32]) -> Result<()> {
    let mut buf = Vec::with_capacity(HEADER_SIZE + size_of_val(params));
    buf.extend_from_slice(&MAGIC);
    buf.extend_from_slice(&VERSION.to_be_bytes());
    buf.extend_from_slice(&(params.len() as u64).to_be_bytes());
    buf.extend_from_slice(bytemuck::cast_slice(params));

    fs::write(path.as_ref(), buf)?;
    debug!(params = params.len(); "saved checkpoint to {}", path.as_ref().display());
    Ok(())
}

/// Reads the parameters stored at `path`.
///
/// # Errors
/// - `MlErr::Io` if the file can't be read.
/// - `MlErr::Checkpoint` if it isn't a checkpoint or it's truncated.
pub fn load<P: AsRef<Path>>(path: P) -> Result<Vec<f32>> {
    let bytes = fs::read(path.as_ref())?;
    decode(&bytes)
}

/// Loads the checkpoint at `path` into `model`.
pub fn restore<M, P>(model: &mut M, path: P) -> Result<()>
where
    M: Model + ?Sized,
    P: AsRef<Path>,
{
    model.load_params(load(path)?)
}

fn decode(bytes: &[u8]) -> Result<Vec<f32>> {
    let truncated = || {
        MlErr::Checkpoint(format!(
            "{} bytes is shorter than the {HEADER_SIZE} byte header",
            bytes.len()
        ))
    };

    let (magic, rest) = bytes.split_first_chunk::<4>().ok_or_else(truncated)?;
    let (version, rest) = rest.split_first_chunk::<4>().ok_or_else(truncated)?;
    let (count, payload) = rest.split_first_chunk::<8>().ok_or_else(truncated)?;

    if *magic != MAGIC {
        return Err(MlErr::Checkpoint("missing magic bytes".into()));
    }

    let version = u32::from_be_bytes(*version);
    if version != VERSION {
        return Err(MlErr::Checkpoint(format!("unsupported version {version}")));
    }

    let count = u64::from_be_bytes(*count) as usize;

    let expected = count.saturating_mul(size_of::<f32>());
    if payload.len() != expected {
        return Err(MlErr::Checkpoint(format!(
            "expected {expected} payload bytes for {count} parameters, got {}",
            payload.len()
        )));
    }

    Ok(bytemuck::pod_collect_to_vec(payload))
}
