//! Company name / stock code resolution

use crate::cache::DirectoryCache;
use crate::error::{Result, StockError};
use crate::model::{CompanyDirectory, SecurityCode};

/// Map a user identifier to a security code.
///
/// A 6-digit code is returned as-is without looking at `directory`; anything
/// else must equal a listed company name exactly, and the first listing with
/// that name wins.
pub fn resolve(identifier: &str, directory: &CompanyDirectory) -> Result<SecurityCode> {
    if let Some(code) = SecurityCode::parse(identifier) {
        return Ok(code);
    }

    directory
        .find(identifier)
        .map(|listing| listing.code.clone())
        .ok_or_else(|| StockError::SymbolNotFound(identifier.to_string()))
}

/// Outcome of an async resolution: the code, plus the reason the company
/// listing is unavailable when the last attempt to load it failed
#[derive(Debug)]
pub struct Resolution {
    pub code: Result<SecurityCode>,
    pub listing_error: Option<String>,
}

impl Resolution {
    /// The resolved code and any listing failure worded as a warning
    pub fn into_code_and_warnings(self) -> Result<(SecurityCode, Vec<String>)> {
        let code = self.code?;
        let warnings = self
            .listing_error
            .map(|e| format!("Company listing unavailable: {e}"))
            .into_iter()
            .collect();
        Ok((code, warnings))
    }
}

/// Resolver backed by the cached company directory
#[derive(Clone)]
pub struct SymbolResolver {
    directory: DirectoryCache,
}

impl SymbolResolver {
    pub fn new(directory: DirectoryCache) -> Self {
        Self { directory }
    }

    /// Resolve against the cached directory.
    ///
    /// Codes never load the listing, but still report a failure left by an
    /// earlier load. A name looked up while the listing cannot be loaded fails
    /// with [`StockError::ListingUnavailable`], which carries the cause.
    pub async fn resolve(&self, identifier: &str) -> Resolution {
        if let Some(code) = SecurityCode::parse(identifier) {
            return Resolution {
                code: Ok(code),
                listing_error: self.directory.last_failure().await,
            };
        }

        match self.directory.directory().await {
            Ok(directory) => Resolution {
                code: resolve(identifier, &directory),
                listing_error: None,
            },
            Err(e) => {
                tracing::warn!("Company listing unavailable, only 6-digit codes resolve: {}", e);
                let reason = e.to_string();
                Resolution {
                    code: Err(StockError::ListingUnavailable {
                        identifier: identifier.to_string(),
                        reason: reason.clone(),
                    }),
                    listing_error: Some(reason),
                }
            }
        }
    }

    pub fn directory_cache(&self) -> &DirectoryCache {
        &self.directory
    }
}
