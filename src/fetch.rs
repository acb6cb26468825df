// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::error::{self, Result};
use crate::transport::Transport;
use snafu::{ensure, ResultExt};
use std::io::Read;
use url::Url;

/// Fetch `url` and return its bytes, failing if the body exceeds `max_size`.
/// `specifier` names where the limit came from for error messages. The read
/// is capped, so an endless response costs at most `max_size` bytes.
pub(crate) fn fetch_max_size(
    transport: &dyn Transport,
    url: Url,
    max_size: u64,
    specifier: &'static str,
) -> Result<Vec<u8>> {
    let reader = transport.fetch(url.clone()).context(error::Transport {
        url: url.clone(),
    })?;

    let mut data = Vec::new();
    reader
        .take(max_size.saturating_add(1))
        .read_to_end(&mut data)
        .context(error::Fetch { url })?;
    ensure!(
        data.len() as u64 <= max_size,
        error::MaxSizeExceeded { max_size, specifier }
    );
    Ok(data)
}
