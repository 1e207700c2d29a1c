//! Platform backends for the [`crate::api`] seam.
//!
//! Only Windows has Raw Input. On other hosts the crate still builds so the routing core
//! and its tests run anywhere; there is simply no live backend to hand the manager.

#[cfg(windows)]
#[cfg_attr(docsrs, doc(cfg(windows)))]
pub mod windows;
