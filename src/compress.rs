//! Compressed-size measurement with the two competing codecs.

use std::io::Write;
use std::sync::Arc;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::{PagetrimError, Result};

const BROTLI_QUALITY: u32 = 11;
const BROTLI_WINDOW: u32 = 22;
const BROTLI_BUFFER: usize = 4096;

/// Size of `data` after gzip at the best compression level.
pub fn gzip_size(data: &[u8]) -> std::io::Result<u64> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data)?;
    Ok(encoder.finish()?.len() as u64)
}

/// Size of `data` after brotli at maximum quality.
pub fn brotli_size(data: &[u8]) -> std::io::Result<u64> {
    let mut out = Vec::new();
    {
        let mut writer =
            brotli::CompressorWriter::new(&mut out, BROTLI_BUFFER, BROTLI_QUALITY, BROTLI_WINDOW);
        writer.write_all(data)?;
        writer.flush()?;
    }
    Ok(out.len() as u64)
}

/// Both compressed sizes of one body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressedSizes {
    pub brotli: u64,
    pub gzip: u64,
}

/// Computes both sizes concurrently on the blocking pool.
pub async fn measure(data: Arc<[u8]>) -> Result<CompressedSizes> {
    let for_brotli = data.clone();
    let brotli = tokio::task::spawn_blocking(move || brotli_size(&for_brotli));
    let gzip = tokio::task::spawn_blocking(move || gzip_size(&data));

    let (brotli, gzip) = tokio::join!(brotli, gzip);
    let joined =
        |err: tokio::task::JoinError| PagetrimError::Unknown(format!("compression task failed: {err}"));
    Ok(CompressedSizes {
        brotli: brotli.map_err(joined)??,
        gzip: gzip.map_err(joined)??,
    })
}
