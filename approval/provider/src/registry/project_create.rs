// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT

use approval_sdk::{ProposalBody, SyncPayload, VoteRequest, VoteType};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApprovalError, Result};
use crate::registry::{execute, load_request, new_vote_request, HandlerContext, VoteTypeHandler};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectCreateConfig {
    pub project_id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<String>,
}

/// Every member of the new project votes, the initiator included.
pub struct ProjectCreateHandler {
    ctx: HandlerContext,
}

impl ProjectCreateHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl VoteTypeHandler for ProjectCreateHandler {
    fn vote_type(&self) -> VoteType {
        VoteType::ProjectCreate
    }

    fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    fn propose(&self, participant: &str, config: Value) -> Result<VoteRequest> {
        let config: ProjectCreateConfig = serde_json::from_value(config)?;
        if config.project_id.is_empty() {
            return Err(ApprovalError::InvalidPayload(
                "projectId must not be empty".to_string(),
            ));
        }

        let mut voters = vec![participant.to_string()];
        voters.extend(config.members.iter().cloned());

        let fields = match serde_json::to_value(&config)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        new_vote_request(
            VoteType::ProjectCreate,
            participant,
            voters,
            vec![participant.to_string()],
            fields,
        )
    }

    async fn on_quorum_approved(&self, vote_id: &str) -> Result<Vec<SyncPayload>> {
        let request = load_request(&self.ctx, vote_id)?;
        log::info!("project creation approved by vote {vote_id}");
        execute(&self.ctx, &request).await?;
        Ok(vec![])
    }

    fn title(&self, body: &ProposalBody) -> String {
        format!(
            "Create project {} ({})",
            body.field::<String>("name").unwrap_or_default(),
            body.field::<String>("projectId").unwrap_or_default()
        )
    }
}
