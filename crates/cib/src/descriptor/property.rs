use super::{Descriptor, PropertySpec};
use crate::error::{Error, Result};
use crate::model::{Attributes, PropertyScope};
use crate::params::{parse_pairs, tokenize};
use declarative::Intent;
use serde::{Deserialize, Serialize};

/// Parameters of a cluster property or resource default block.
///
/// When present, `params` holds `key=value` pairs to set. When absent it
/// lists the names to remove, with or without a value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PropertyParams {
    pub params: Option<String>,
    pub state: Intent,
}

impl PropertyParams {
    pub fn build(&self, scope: PropertyScope) -> Result<Descriptor> {
        let raw = self.params.as_deref().unwrap_or_default();
        let values = match self.state {
            Intent::Present => Attributes::from_pairs(parse_pairs("params", raw)?),
            Intent::Absent => tokenize("params", raw)?
                .into_iter()
                .map(|token| {
                    let name = token.split_once('=').map_or(token.as_str(), |(k, _)| k);
                    if name.is_empty() {
                        Err(Error::validation("params", format!("empty name in '{token}'")))
                    } else {
                        Ok((name.to_string(), String::new()))
                    }
                })
                .collect::<Result<Attributes>>()?,
        };
        if values.is_empty() {
            return Err(Error::validation("params", "at least one property is required"));
        }
        Ok(Descriptor::Property(PropertySpec {
            scope,
            values,
            intent: self.state,
        }))
    }
}
