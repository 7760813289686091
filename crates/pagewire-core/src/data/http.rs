// ── Remote text source ──
//
// Fetches a text body and splits it on a separator character. Each
// non-blank piece becomes one row whose label and value are the piece.

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use pagewire_api::TextClient;
use secrecy::SecretString;
use tracing::debug;
use url::Url;

use super::source::DataSource;
use super::state::LoadError;
use crate::model::Row;
use crate::model::row::keys;

pub const DEFAULT_SEPARATOR: char = '\n';

pub struct HttpTextSource {
    client: TextClient,
    url: Url,
    separator: char,
    token: Option<SecretString>,
}

impl HttpTextSource {
    pub fn new(client: TextClient, url: Url) -> Self {
        Self {
            client,
            url,
            separator: DEFAULT_SEPARATOR,
            token: None,
        }
    }

    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    /// Send `Authorization: Bearer <token>` with every request.
    pub fn with_token(mut self, token: SecretString) -> Self {
        self.token = Some(token);
        self
    }
}

impl DataSource for HttpTextSource {
    fn load(&self) -> BoxFuture<'_, Result<Vec<Row>, LoadError>> {
        async move {
            let body = self.client.fetch(&self.url, self.token.as_ref()).await?;
            let rows = split_rows(&body, self.separator);
            debug!(url = %self.url, rows = rows.len(), "text source loaded");
            Ok(rows)
        }
        .boxed()
    }
}

/// Split `body` on `separator`, trimming pieces and dropping blank ones.
pub fn split_rows(body: &str, separator: char) -> Vec<Row> {
    body.split(separator)
        .map(str::trim)
        .filter(|piece| !piece.is_empty())
        .map(|piece| Row::new().with(keys::LABEL, piece).with(keys::VALUE, piece))
        .collect()
}
