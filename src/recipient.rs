use async_trait::async_trait;
use ethers::types::Address;
use ethers::utils::to_checksum;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::BAD_RECIPIENT_ADDRESSES;
use crate::error::InputError;
use crate::types::Trade;

static ENS_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_+.~#?&/=]*)?$")
        .unwrap()
});

static ADDRESS_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0x[a-fA-F0-9]{40}$").unwrap());

static BAD_RECIPIENTS: Lazy<Vec<Address>> = Lazy::new(|| {
    BAD_RECIPIENT_ADDRESSES
        .iter()
        .map(|address| address.parse().unwrap())
        .collect()
});

/// Name resolution service (ENS).
#[async_trait]
pub trait NameResolver: Send + Sync {
    /// `None` while resolution is unavailable or the name has no address.
    async fn resolve_name(&self, name: &str) -> Option<Address>;
}

/// Parses a `0x`-prefixed, 40 hex character address. All-lowercase and
/// all-uppercase hex are accepted as is, mixed case must be a valid EIP-55
/// checksum.
pub fn is_address(value: &str) -> Option<Address> {
    if !ADDRESS_REGEX.is_match(value) {
        return None;
    }
    let address: Address = value.parse().ok()?;

    let hex = &value[2..];
    let mixed_case = hex.chars().any(|c| c.is_ascii_lowercase())
        && hex.chars().any(|c| c.is_ascii_uppercase());
    if mixed_case && to_checksum(&address, None) != value {
        debug!("bad address checksum for {}", value);
        return None;
    }
    Some(address)
}

pub fn looks_like_ens_name(value: &str) -> bool {
    ENS_NAME_REGEX.is_match(value)
}

/// `0xAbCd...WxYz` with `chars` characters kept on each side.
pub fn shorten_address(address: Address, chars: usize) -> String {
    let checksummed = to_checksum(&address, None);
    format!(
        "{}...{}",
        &checksummed[..chars + 2],
        &checksummed[42 - chars..]
    )
}

/// Resolves the recipient of a swap. A `None` identifier means "send to the
/// connected account"; anything else is an address or a name to resolve.
pub async fn resolve_recipient(
    recipient: Option<&str>,
    account: Option<Address>,
    resolver: &dyn NameResolver,
) -> Option<Address> {
    match recipient {
        None => account,
        Some(identifier) => match is_address(identifier) {
            Some(address) => Some(address),
            None => {
                let resolved = resolver.resolve_name(identifier).await;
                debug!("resolved recipient {:?} to {:?}", identifier, resolved);
                resolved
            }
        },
    }
}

pub fn is_bad_recipient(address: Address) -> bool {
    BAD_RECIPIENTS.contains(&address)
}

/// Checks a resolved recipient against the reserved infrastructure addresses
/// and every token and pool of the candidate trades.
pub fn validate_recipient<'a>(
    to: Option<Address>,
    trades: impl IntoIterator<Item = &'a Trade>,
) -> Result<Address, InputError> {
    let to = to.ok_or(InputError::EnterRecipient)?;

    if is_bad_recipient(to) || trades.into_iter().any(|trade| trade.involves_address(to)) {
        return Err(InputError::InvalidRecipient);
    }

    Ok(to)
}
