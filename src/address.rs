//! IPv4 address classification and assignment.
//!
//! Addresses inside 10.0.0.0/8, 172.16.0.0/12, and 192.168.0.0/16 are
//! private; every other address is public.

use std::fmt;
use std::net::Ipv4Addr;

/// Reachability class of an IPv4 address.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AddressClass {
    /// Routable from the internet.
    Public,
    /// Inside a reserved RFC 1918 block.
    Private,
}

impl fmt::Display for AddressClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Public => "public",
            Self::Private => "private",
        })
    }
}

/// Classifies `address` as public or private.
#[must_use]
pub const fn classify(address: Ipv4Addr) -> AddressClass {
    if address.is_private() {
        AddressClass::Private
    } else {
        AddressClass::Public
    }
}

/// Addresses selected for an instance.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AssignedAddresses {
    /// First public address reported.
    pub public: Ipv4Addr,
    /// First private address reported, when one was requested.
    pub private: Option<Ipv4Addr>,
}

/// Picks the first public address and, when `want_private` is set, the first
/// private address.
///
/// # Errors
///
/// Returns the [`AddressClass`] that could not be satisfied: public when no
/// public address exists, private when one was requested and none exists.
pub fn assign(
    addresses: &[Ipv4Addr],
    want_private: bool,
) -> Result<AssignedAddresses, AddressClass> {
    let first_of = |class: AddressClass| {
        addresses
            .iter()
            .copied()
            .find(|address| classify(*address) == class)
    };

    let public = first_of(AddressClass::Public).ok_or(AddressClass::Public)?;
    let private = if want_private {
        Some(first_of(AddressClass::Private).ok_or(AddressClass::Private)?)
    } else {
        None
    };
    Ok(AssignedAddresses { public, private })
}
