use crate::parsers::html;
use crate::utils::normalize_label;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Where item detail objects live in the payloads we know about, most specific first.
/// The empty pointer is the document root.
const DETAIL_ROOTS: &[&str] = &["/data/itemPage", "/data/item", "/item", ""];

const DISPLAY_PRICE_FIELDS: &[&str] = &["displayPrice", "displayString", "priceDisplayString"];
const AMOUNT_FIELDS: &[&str] = &["unitAmount", "priceCents", "price"];
const OPTION_LIST_FIELDS: &[&str] = &["optionLists", "optionGroups", "options"];

/// An item decoded from a detail payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecodedItem {
    pub id: Option<String>,
    pub name: String,
    pub description: Option<String>,
    /// Price as displayed, e.g. `$5.99`
    pub price: Option<String>,
    /// Price in minor units when the payload carries one
    pub price_cents: Option<i64>,
    pub options: Vec<OptionGroup>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionGroup {
    pub name: String,
    pub choices: Vec<OptionChoice>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionChoice {
    pub name: String,
    pub price: Option<String>,
    pub price_cents: Option<i64>,
}

/// Find the detail object and its header (the object carrying `name`)
fn locate(value: &Value) -> Option<(&Value, &Map<String, Value>)> {
    for pointer in DETAIL_ROOTS {
        let Some(root) = value.pointer(pointer) else {
            continue;
        };
        let header = root.get("itemHeader").unwrap_or(root);
        if let Some(obj) = header.as_object() {
            if text_field(obj, &["name"]).is_some() {
                return Some((root, obj));
            }
        }
    }
    None
}

/// First non-empty string among the given fields
fn text_field(obj: &Map<String, Value>, fields: &[&str]) -> Option<String> {
    fields
        .iter()
        .filter_map(|f| obj.get(*f))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
        .map(|s| s.to_string())
}

/// Identifiers may be strings or numbers depending on the API
fn id_field(obj: &Map<String, Value>) -> Option<String> {
    match obj.get("id")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn amount_field(obj: &Map<String, Value>) -> Option<i64> {
    AMOUNT_FIELDS
        .iter()
        .filter_map(|f| obj.get(*f))
        .find_map(|v| match v {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
}

fn display_price(obj: &Map<String, Value>) -> Option<String> {
    text_field(obj, DISPLAY_PRICE_FIELDS).or_else(|| {
        // some payloads put a preformatted string under `price`
        obj.get("price")
            .and_then(Value::as_str)
            .filter(|s| s.trim().parse::<i64>().is_err())
            .map(|s| s.trim().to_string())
    })
}

fn option_groups(root: &Value, header: &Map<String, Value>) -> Vec<OptionGroup> {
    let lists = OPTION_LIST_FIELDS
        .iter()
        .filter_map(|f| root.get(*f).or_else(|| header.get(*f)))
        .find_map(Value::as_array);

    let Some(lists) = lists else {
        return Vec::new();
    };

    lists
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|list| {
            let name = text_field(list, &["name", "title"])?;
            let choices = list
                .get("options")
                .or_else(|| list.get("choices"))
                .and_then(Value::as_array)
                .map(|options| {
                    options
                        .iter()
                        .filter_map(Value::as_object)
                        .filter_map(|o| {
                            Some(OptionChoice {
                                name: text_field(o, &["name", "title"])?,
                                price: display_price(o),
                                price_cents: amount_field(o),
                            })
                        })
                        .collect()
                })
                .unwrap_or_default();
            Some(OptionGroup { name, choices })
        })
        .collect()
}

/// Normalised identifiers (item name, and id when present) found in a payload.
///
/// Empty when the payload has no recognisable item; that is not an error here.
pub fn probe_identifiers(value: &Value) -> Vec<String> {
    let Some((_, header)) = locate(value) else {
        return Vec::new();
    };

    let mut ids = Vec::with_capacity(2);
    if let Some(name) = text_field(header, &["name"]) {
        ids.push(normalize_label(&name));
    }
    if let Some(id) = id_field(header) {
        let id = normalize_label(&id);
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Decode an item detail payload.
///
/// Unknown fields are ignored. The only required field is a non-empty `name`;
/// without one the error explains what the payload carried instead.
pub fn decode(value: &Value) -> Result<DecodedItem, String> {
    let Some((root, header)) = locate(value) else {
        return Err(describe_missing(value));
    };

    let name = text_field(header, &["name"]).ok_or_else(|| "item name is empty".to_string())?;
    let description = text_field(header, &["description", "itemDescription"])
        .map(|d| html::plain_text(&d))
        .filter(|d| !d.is_empty());

    Ok(DecodedItem {
        id: id_field(header),
        name,
        description,
        price: display_price(header),
        price_cents: amount_field(header),
        options: option_groups(root, header),
    })
}

fn describe_missing(value: &Value) -> String {
    let first_error = value
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first())
        .and_then(|e| e.get("message"))
        .and_then(Value::as_str);

    match first_error {
        Some(message) => format!("API returned an error: {}", message),
        None => "no item detail object with a name".to_string(),
    }
}
