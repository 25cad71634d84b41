//! Blocking [`Service`] over the Dataverse Web API.
//!
//! Entity definitions are fetched once and cached for the life of the
//! service. Access tokens obtained through the refresh-token grant are
//! cached until shortly before they expire.

use std::cell::{OnceCell, RefCell};
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::de::DeserializeOwned;
use serde_json::Value;

use dynamics_core::{Auth, Config};

use crate::entity::{Entity, EntityType, OptionSetMap};
use crate::error::{decode_err, from_ureq, ClientError};
use crate::metadata::{collect_optionsets, Collection, EntityDefinition, OptionSetAttribute};
use crate::query::Query;
use crate::service::{Rows, Service};

/// Refresh this long before the token's stated expiry.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

const OPTIONSET_CASTS: [&str; 3] = [
    "PicklistAttributeMetadata",
    "StateAttributeMetadata",
    "StatusAttributeMetadata",
];

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Option<Instant>,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        self.expires_at.map_or(true, |at| Instant::now() < at)
    }
}

/// Live connection to one organisation.
pub struct WebApiService {
    agent: ureq::Agent,
    base: String,
    resource: String,
    auth: Auth,
    page_size: u32,
    token: RefCell<Option<AccessToken>>,
    definitions: OnceCell<Vec<EntityType>>,
}

impl WebApiService {
    pub fn new(config: &Config) -> Result<Self, ClientError> {
        let auth = config
            .auth()
            .map_err(|e| ClientError::Auth(e.to_string()))?;
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent)
            .build();
        Ok(Self {
            agent,
            base: config.api_base(),
            resource: config.url.trim_end_matches('/').to_string(),
            auth,
            page_size: config.page_size,
            token: RefCell::new(None),
            definitions: OnceCell::new(),
        })
    }

    /// Current bearer token, exchanging the refresh token when needed.
    fn bearer(&self) -> Result<String, ClientError> {
        let (client_id, client_secret, refresh_token, token_url) = match &self.auth {
            Auth::Bearer(token) => return Ok(token.clone()),
            Auth::RefreshToken {
                client_id,
                client_secret,
                refresh_token,
                token_url,
            } => (client_id, client_secret, refresh_token, token_url),
        };

        if let Some(token) = self.token.borrow().as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        tracing::debug!(token_url = %token_url, "refreshing access token");
        let response = self
            .agent
            .post(token_url)
            .send_form(&[
                ("grant_type", "refresh_token"),
                ("client_id", client_id.as_str()),
                ("client_secret", client_secret.as_str()),
                ("refresh_token", refresh_token.as_str()),
                ("resource", self.resource.as_str()),
            ])
            .map_err(|e| from_ureq(token_url, e))?;
        let body: Value = response
            .into_json()
            .map_err(|e| decode_err(token_url, e))?;

        let value = body
            .get("access_token")
            .and_then(Value::as_str)
            .ok_or_else(|| ClientError::Auth("token response has no access_token".to_string()))?
            .to_string();
        let expires_in = body.get("expires_in").and_then(|v| match v {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.parse().ok(),
            _ => None,
        });
        let expires_at = expires_in.map(|secs| {
            Instant::now() + Duration::from_secs(secs).saturating_sub(TOKEN_EXPIRY_MARGIN)
        });

        *self.token.borrow_mut() = Some(AccessToken {
            value: value.clone(),
            expires_at,
        });
        Ok(value)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
        paged: bool,
    ) -> Result<T, ClientError> {
        let token = self.bearer()?;
        let mut request = self
            .agent
            .get(url)
            .set("Authorization", &format!("Bearer {token}"))
            .set("Accept", "application/json")
            .set("OData-MaxVersion", "4.0")
            .set("OData-Version", "4.0");
        if paged {
            request = request.set("Prefer", &format!("odata.maxpagesize={}", self.page_size));
        }
        for (key, value) in params {
            request = request.query(key, value);
        }
        tracing::debug!(url = %url, "GET");
        let response = request.call().map_err(|e| from_ureq(url, e))?;
        response.into_json().map_err(|e| decode_err(url, e))
    }

    /// Fetch every page of a metadata collection.
    fn get_all<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(&str, String)],
    ) -> Result<Vec<T>, ClientError> {
        let mut page: Collection<T> = self.get_json(url, params, false)?;
        let mut items = std::mem::take(&mut page.value);
        while let Some(next) = page.next_link.take() {
            page = self.get_json(&next, &[], false)?;
            items.append(&mut page.value);
        }
        Ok(items)
    }

    fn load_definitions(&self) -> Result<Vec<EntityType>, ClientError> {
        let url = format!("{}EntityDefinitions", self.base);
        let params = [
            ("$select", "LogicalName,EntitySetName,PrimaryIdAttribute".to_string()),
            (
                "$expand",
                "Attributes($select=LogicalName,AttributeType,IsValidForRead,AttributeOf)"
                    .to_string(),
            ),
        ];
        let definitions: Vec<EntityDefinition> = self.get_all(&url, &params)?;
        let mut entities: Vec<EntityType> = definitions
            .into_iter()
            .filter_map(EntityDefinition::into_entity_type)
            .collect();
        entities.sort_by(|a, b| a.entity_set.cmp(&b.entity_set));
        tracing::info!(count = entities.len(), "loaded entity definitions");
        Ok(entities)
    }

    fn definitions(&self) -> Result<&[EntityType], ClientError> {
        if let Some(defs) = self.definitions.get() {
            return Ok(defs.as_slice());
        }
        let loaded = self.load_definitions()?;
        Ok(self.definitions.get_or_init(|| loaded).as_slice())
    }
}

impl Service for WebApiService {
    fn entity_types(&self) -> Result<Vec<EntityType>, ClientError> {
        Ok(self.definitions()?.to_vec())
    }

    fn entity_type(&self, entity_set: &str) -> Result<EntityType, ClientError> {
        self.definitions()?
            .iter()
            .find(|e| e.entity_set == entity_set)
            .cloned()
            .ok_or_else(|| ClientError::EntityNotFound(entity_set.to_string()))
    }

    fn optionset_map(&self, entity: &EntityType) -> Result<OptionSetMap, ClientError> {
        let mut map = OptionSetMap::new();
        for cast in OPTIONSET_CASTS {
            let url = format!(
                "{}EntityDefinitions(LogicalName='{}')/Attributes/Microsoft.Dynamics.CRM.{}",
                self.base, entity.logical_name, cast
            );
            let params = [
                ("$select", "LogicalName".to_string()),
                ("$expand", "OptionSet($select=Options)".to_string()),
            ];
            let attributes: Vec<OptionSetAttribute> = self.get_all(&url, &params)?;
            collect_optionsets(&mut map, attributes);
        }
        Ok(map)
    }

    fn query<'a>(&'a self, query: Query) -> Result<Rows<'a>, ClientError> {
        let url = format!("{}{}", self.base, query.entity_set);
        let params = query
            .params()
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        Ok(Box::new(Pages {
            service: self,
            next: Some(PageRequest::First { url, params }),
            buffer: VecDeque::new(),
        }))
    }
}

enum PageRequest {
    First {
        url: String,
        params: Vec<(String, String)>,
    },
    /// Absolute `@odata.nextLink`, followed verbatim.
    Link(String),
}

/// Row iterator that fetches the next page only when the buffer runs dry.
struct Pages<'a> {
    service: &'a WebApiService,
    next: Option<PageRequest>,
    buffer: VecDeque<Entity>,
}

impl Pages<'_> {
    fn fetch(&self, request: &PageRequest) -> Result<Collection<Entity>, ClientError> {
        match request {
            PageRequest::First { url, params } => {
                let params: Vec<(&str, String)> =
                    params.iter().map(|(k, v)| (k.as_str(), v.clone())).collect();
                self.service.get_json(url, &params, true)
            }
            PageRequest::Link(url) => self.service.get_json(url, &[], true),
        }
    }
}

impl Iterator for Pages<'_> {
    type Item = Result<Entity, ClientError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(row) = self.buffer.pop_front() {
                return Some(Ok(row));
            }
            let request = self.next.take()?;
            match self.fetch(&request) {
                Ok(page) => {
                    self.next = page.next_link.map(PageRequest::Link);
                    self.buffer.extend(page.value);
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
