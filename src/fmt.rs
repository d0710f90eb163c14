// SPDX-License-Identifier: Apache-2.0

//! Logging macros that forward to [`defmt`](https://docs.rs/defmt) on the RP2040 and to the
//! [`log`] facade everywhere else (host unit tests).
//!
//! Only plain `{}` placeholders are portable between the two backends.
#![allow(unused_macros)]

/// Forward to `defmt::trace!` or `log::trace!`
macro_rules! trace {
    ($($arg:tt)*) => {{
        #[cfg(target_os = "none")]
        ::defmt::trace!($($arg)*);
        #[cfg(not(target_os = "none"))]
        ::log::trace!($($arg)*);
    }};
}

/// Forward to `defmt::debug!` or `log::debug!`
macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(target_os = "none")]
        ::defmt::debug!($($arg)*);
        #[cfg(not(target_os = "none"))]
        ::log::debug!($($arg)*);
    }};
}

/// Forward to `defmt::info!` or `log::info!`
macro_rules! info {
    ($($arg:tt)*) => {{
        #[cfg(target_os = "none")]
        ::defmt::info!($($arg)*);
        #[cfg(not(target_os = "none"))]
        ::log::info!($($arg)*);
    }};
}

/// Forward to `defmt::warn!` or `log::warn!`
macro_rules! warn {
    ($($arg:tt)*) => {{
        #[cfg(target_os = "none")]
        ::defmt::warn!($($arg)*);
        #[cfg(not(target_os = "none"))]
        ::log::warn!($($arg)*);
    }};
}

/// Forward to `defmt::error!` or `log::error!`
macro_rules! error {
    ($($arg:tt)*) => {{
        #[cfg(target_os = "none")]
        ::defmt::error!($($arg)*);
        #[cfg(not(target_os = "none"))]
        ::log::error!($($arg)*);
    }};
}
