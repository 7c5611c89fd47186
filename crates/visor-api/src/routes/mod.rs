//! # Route Handlers
//!
//! | Route                              | Module          | Guard              |
//! |------------------------------------|-----------------|--------------------|
//! | `POST /api/access-token/`          | [`issuance`]    | issuance API key   |
//! | `GET /api/validate-access/?token=` | [`validation`]  | access credential  |
//! | `GET /api/reports/?token=`         | [`reports`]     | access credential  |
//! | `GET /api/pdf/v2/{credential}/`    | [`documents`]   | document credential |

pub mod documents;
pub mod issuance;
pub mod reports;
pub mod validation;

/// The first `token` parameter of a raw query string.
///
/// Parsed by hand so that odd query strings (duplicates, stray keys) degrade
/// to an absent credential instead of an extractor rejection.
pub(crate) fn token_param(query: Option<&str>) -> Option<String> {
    url::form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == "token")
        .map(|(_, value)| value.into_owned())
}
