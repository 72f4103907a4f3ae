//! Google Sheets implementation of [`ContactStore`].
//!
//! The contact table is a single sheet with one row per contact. Column order
//! is significant: status updates and token lookups address cells by
//! position.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use google_sheets4::api::{
    BatchUpdateSpreadsheetRequest, CellData, CellFormat, Color, GridProperties, GridRange,
    RepeatCellRequest, Request, SheetProperties, Spreadsheet, SpreadsheetProperties, TextFormat,
    UpdateSheetPropertiesRequest, ValueRange,
};
use google_sheets4::hyper_rustls::HttpsConnector;
use google_sheets4::FieldMask;
use google_sheets4::Sheets;
use std::str::FromStr;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;
use serde_json::Value;
use std::path::Path;

use crate::store::ContactStore;
use shared_types::{Contact, ContactStatus, NewContact, TokenGenerator};

pub const SHEET_RANGE: &str = "Sheet1";

pub const HEADERS: [&str; 8] = [
    "Email",
    "Name",
    "Source",
    "Date Added",
    "Classification",
    "Status",
    "Unsubscribe Token",
    "Notes",
];

// Column F holds the status; sheet rows are 1-indexed.
const STATUS_COLUMN: &str = "F";

type SheetsHub = Sheets<HttpsConnector<HttpConnector>>;

pub struct SheetContactStore {
    hub: SheetsHub,
    sheet_id: String,
    tokens: TokenGenerator,
}

impl SheetContactStore {
    /// CLI construction: installed-flow OAuth with an on-disk token cache.
    pub async fn with_installed_flow(
        credentials_path: &Path,
        token_cache_path: &Path,
        sheet_id: impl Into<String>,
        tokens: TokenGenerator,
    ) -> Result<Self> {
        let secret = google_sheets4::yup_oauth2::read_application_secret(credentials_path)
            .await
            .context("Failed to read OAuth credentials")?;

        let auth = google_sheets4::yup_oauth2::InstalledFlowAuthenticator::builder(
            secret,
            google_sheets4::yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
        )
        .persist_tokens_to_disk(token_cache_path)
        .build()
        .await
        .context("Failed to build authenticator")?;

        let client = Client::builder(TokioExecutor::new()).build(build_connector()?);

        Ok(Self {
            hub: Sheets::new(client, auth),
            sheet_id: sheet_id.into(),
            tokens,
        })
    }

    /// Server construction: service-account key, no interactive consent.
    pub async fn with_service_account(
        key_path: &Path,
        sheet_id: impl Into<String>,
        tokens: TokenGenerator,
    ) -> Result<Self> {
        let key = google_sheets4::yup_oauth2::read_service_account_key(key_path)
            .await
            .context("Failed to read service account key")?;

        let auth = google_sheets4::yup_oauth2::ServiceAccountAuthenticator::builder(key)
            .build()
            .await
            .context("Failed to build service account authenticator")?;

        let client = Client::builder(TokioExecutor::new()).build(build_connector()?);

        Ok(Self {
            hub: Sheets::new(client, auth),
            sheet_id: sheet_id.into(),
            tokens,
        })
    }

    /// All rows of the contact range as strings, header row included.
    async fn read_rows(&self) -> Result<Vec<Vec<String>>> {
        let (_, value_range) = self
            .hub
            .spreadsheets()
            .values_get(&self.sheet_id, &format!("{SHEET_RANGE}!A:H"))
            .doit()
            .await
            .context("Failed to read contact sheet")?;

        let rows = value_range
            .values
            .unwrap_or_default()
            .into_iter()
            .map(|row| row.into_iter().map(cell_to_string).collect())
            .collect();

        Ok(rows)
    }
}

impl ContactStore for SheetContactStore {
    async fn list_all(&self) -> Result<Vec<Contact>> {
        let rows = self.read_rows().await?;
        Ok(rows
            .iter()
            .skip(1) // header row
            .filter_map(|row| row_to_contact(row))
            .collect())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Contact>> {
        let needle = email.trim().to_lowercase();
        let contacts = self.list_all().await?;
        Ok(contacts.into_iter().find(|c| c.email_key() == needle))
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<Contact>> {
        let contacts = self.list_all().await?;
        Ok(contacts.into_iter().find(|c| c.unsubscribe_token == token))
    }

    async fn append(&self, contact: NewContact) -> Result<bool> {
        let key = contact.email.trim().to_lowercase();
        let existing = self.list_all().await?;
        if existing.iter().any(|c| c.email_key() == key) {
            return Ok(false);
        }

        let token = self.tokens.token(&contact.email);
        let row = contact_to_row(&contact, &token, Utc::now());

        self.hub
            .spreadsheets()
            .values_append(
                ValueRange {
                    values: Some(vec![row]),
                    ..Default::default()
                },
                &self.sheet_id,
                &format!("{SHEET_RANGE}!A:H"),
            )
            .value_input_option("RAW")
            .insert_data_option("INSERT_ROWS")
            .doit()
            .await
            .context("Failed to append contact")?;

        Ok(true)
    }

    async fn set_status(&self, email: &str, status: ContactStatus) -> Result<bool> {
        let needle = email.trim().to_lowercase();
        let rows = self.read_rows().await?;

        for (i, row) in rows.iter().enumerate().skip(1) {
            let row_email = row.first().map(String::as_str).unwrap_or_default();
            if row_email.trim().to_lowercase() == needle {
                let cell = format!("{SHEET_RANGE}!{STATUS_COLUMN}{}", i + 1);
                self.hub
                    .spreadsheets()
                    .values_update(
                        ValueRange {
                            values: Some(vec![vec![Value::String(
                                status.as_str().to_string(),
                            )]]),
                            ..Default::default()
                        },
                        &self.sheet_id,
                        &cell,
                    )
                    .value_input_option("RAW")
                    .doit()
                    .await
                    .context("Failed to update contact status")?;
                return Ok(true);
            }
        }

        Ok(false)
    }
}

/// Create a new contact spreadsheet with the expected headers, a bold frozen
/// header row, and nothing else. Returns the new spreadsheet's ID.
pub async fn create_sheet(
    credentials_path: &Path,
    token_cache_path: &Path,
    title: &str,
) -> Result<String> {
    let secret = google_sheets4::yup_oauth2::read_application_secret(credentials_path)
        .await
        .context("Failed to read OAuth credentials")?;

    let auth = google_sheets4::yup_oauth2::InstalledFlowAuthenticator::builder(
        secret,
        google_sheets4::yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
    )
    .persist_tokens_to_disk(token_cache_path)
    .build()
    .await
    .context("Failed to build authenticator")?;

    let client = Client::builder(TokioExecutor::new()).build(build_connector()?);
    let hub = Sheets::new(client, auth);

    let (_, spreadsheet) = hub
        .spreadsheets()
        .create(Spreadsheet {
            properties: Some(SpreadsheetProperties {
                title: Some(title.to_string()),
                ..Default::default()
            }),
            ..Default::default()
        })
        .doit()
        .await
        .context("Failed to create spreadsheet")?;

    let sheet_id = spreadsheet
        .spreadsheet_id
        .context("No spreadsheet ID in create response")?;

    let header_row: Vec<Value> = HEADERS
        .iter()
        .map(|h| Value::String(h.to_string()))
        .collect();

    hub.spreadsheets()
        .values_update(
            ValueRange {
                values: Some(vec![header_row]),
                ..Default::default()
            },
            &sheet_id,
            &format!("{SHEET_RANGE}!A1:H1"),
        )
        .value_input_option("RAW")
        .doit()
        .await
        .context("Failed to write headers")?;

    hub.spreadsheets()
        .batch_update(
            BatchUpdateSpreadsheetRequest {
                requests: Some(vec![
                    Request {
                        repeat_cell: Some(RepeatCellRequest {
                            range: Some(GridRange {
                                sheet_id: Some(0),
                                start_row_index: Some(0),
                                end_row_index: Some(1),
                                ..Default::default()
                            }),
                            cell: Some(CellData {
                                user_entered_format: Some(CellFormat {
                                    text_format: Some(TextFormat {
                                        bold: Some(true),
                                        ..Default::default()
                                    }),
                                    background_color: Some(Color {
                                        red: Some(0.9),
                                        green: Some(0.9),
                                        blue: Some(0.95),
                                        ..Default::default()
                                    }),
                                    ..Default::default()
                                }),
                                ..Default::default()
                            }),
                            fields: Some(
                                FieldMask::from_str(
                                    "userEnteredFormat(textFormat,backgroundColor)",
                                )
                                .unwrap(),
                            ),
                        }),
                        ..Default::default()
                    },
                    Request {
                        update_sheet_properties: Some(UpdateSheetPropertiesRequest {
                            properties: Some(SheetProperties {
                                sheet_id: Some(0),
                                grid_properties: Some(GridProperties {
                                    frozen_row_count: Some(1),
                                    ..Default::default()
                                }),
                                ..Default::default()
                            }),
                            fields: Some(
                                FieldMask::from_str("gridProperties.frozenRowCount").unwrap(),
                            ),
                        }),
                        ..Default::default()
                    },
                ]),
                ..Default::default()
            },
            &sheet_id,
        )
        .doit()
        .await
        .context("Failed to format header row")?;

    Ok(sheet_id)
}

fn build_connector() -> Result<HttpsConnector<HttpConnector>> {
    let connector = google_sheets4::hyper_rustls::HttpsConnectorBuilder::new()
        .with_native_roots()
        .context("Failed to load native TLS roots")?
        .https_or_http()
        .enable_http1()
        .build();

    Ok(connector)
}

fn cell_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map(String::as_str).unwrap_or_default()
}

/// Decode a sheet row. Short rows are treated as padded with blanks; rows
/// without an email are skipped entirely.
pub(crate) fn row_to_contact(row: &[String]) -> Option<Contact> {
    let email = cell(row, 0).trim();
    if email.is_empty() {
        return None;
    }

    Some(Contact {
        email: email.to_string(),
        name: cell(row, 1).to_string(),
        source: cell(row, 2).to_string(),
        date_added: DateTime::parse_from_rfc3339(cell(row, 3))
            .ok()
            .map(|d| d.with_timezone(&Utc)),
        classification: shared_types::Category::parse(cell(row, 4)),
        status: ContactStatus::parse(cell(row, 5)),
        unsubscribe_token: cell(row, 6).to_string(),
        notes: cell(row, 7).to_string(),
    })
}

pub(crate) fn contact_to_row(
    contact: &NewContact,
    token: &str,
    added_at: DateTime<Utc>,
) -> Vec<Value> {
    let classification = contact
        .classification
        .map(|c| c.as_str().to_string())
        .unwrap_or_default();

    vec![
        Value::String(contact.email.clone()),
        Value::String(contact.name.clone()),
        Value::String(contact.source.as_str().to_string()),
        Value::String(added_at.to_rfc3339()),
        Value::String(classification),
        Value::String(ContactStatus::Active.as_str().to_string()),
        Value::String(token.to_string()),
        Value::String(contact.notes.clone()),
    ]
}
