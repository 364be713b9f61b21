// CV API: upload -> extracted text, parse preview, generate, download.
// Extraction and rendering block, so handlers hand them to spawn_blocking.

pub mod handlers;
