//! External HTTP services: price feed, swap quotes, co-signing.

pub mod price;
pub mod quote;
pub mod signer;

pub use price::{DexScreenerClient, PriceSource};
pub use quote::{PiteasClient, QuoteRequest, SwapQuoteApi};
pub use signer::{BurnSignMessage, CoSigner, HttpCoSigner, MintSignMessage, MintSignature};

use crate::errors::{AppError, Result};
use url::Url;

/// Append path segments to `base`, keeping any path prefix it already has.
pub(crate) fn endpoint<'a>(
    base: &Url,
    segments: impl IntoIterator<Item = &'a str>,
) -> Result<Url> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| AppError::Config(format!("{base} cannot be used as an API base URL")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}
