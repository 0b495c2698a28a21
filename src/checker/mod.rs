// src/checker/mod.rs
// =============================================================================
// This module contains the link-level logic: is this link a PDF?
//
// Submodules:
// - html: Extracts candidate links from a record's HTML body
// - classify: Decides from the URL alone (PDF / maybe a redirect / neither)
// - redirect: Resolves short links with a per-run cache
// =============================================================================

mod classify;
mod html;
mod redirect;

pub use classify::{Classification, Classifier};
pub use html::extract_hrefs;
pub use redirect::{HeadResponse, HeaderProbe, HttpProbe, LocationPolicy, RedirectResolver};
