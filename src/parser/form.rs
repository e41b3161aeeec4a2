//! ASP.NET anti-forgery tokens on the search form

use crate::parser::ExtractError;
use scraper::{Html, Selector};

/// The hidden WebForms fields that must be posted back with the search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AspTokens {
    pub view_state: String,
    pub view_state_generator: String,
    pub event_validation: String,
}

const VIEW_STATE: &str = "__VIEWSTATE";
const VIEW_STATE_GENERATOR: &str = "__VIEWSTATEGENERATOR";
const EVENT_VALIDATION: &str = "__EVENTVALIDATION";

impl AspTokens {
    /// Reads the three tokens from the search page by element id
    ///
    /// A token element without a `value` attribute posts back as empty, but
    /// a missing element means the page is not the search form at all.
    pub fn extract(html: &str) -> Result<Self, ExtractError> {
        let document = Html::parse_document(html);

        Ok(Self {
            view_state: hidden_value(&document, VIEW_STATE)?,
            view_state_generator: hidden_value(&document, VIEW_STATE_GENERATOR)?,
            event_validation: hidden_value(&document, EVENT_VALIDATION)?,
        })
    }

    /// Form fields in the order they are posted
    pub fn form_fields(&self) -> Vec<(String, String)> {
        vec![
            (VIEW_STATE.to_string(), self.view_state.clone()),
            (
                VIEW_STATE_GENERATOR.to_string(),
                self.view_state_generator.clone(),
            ),
            (EVENT_VALIDATION.to_string(), self.event_validation.clone()),
        ]
    }
}

fn hidden_value(document: &Html, id: &'static str) -> Result<String, ExtractError> {
    let selector = Selector::parse(&format!("#{}", id)).map_err(|_| ExtractError::MissingToken(id))?;

    document
        .select(&selector)
        .next()
        .map(|element| element.value().attr("value").unwrap_or_default().to_string())
        .ok_or(ExtractError::MissingToken(id))
}
