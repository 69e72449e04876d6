// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT

use approval_sdk::{
    ProposalBody, SyncPayload, TeeDatatableManagement, TeeJobKind, TeeJobStatus, VoteRequest,
    VoteType,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApprovalError, Result};
use crate::registry::{execute, load_request, new_vote_request, HandlerContext, VoteTypeHandler};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeeDownloadConfig {
    pub datatable_id: String,
    pub tee_participant: String,
    pub owner: String,
}

/// Lets a TEE participant pull a datatable. The owner and the TEE participant vote, the TEE
/// participant executes.
pub struct TeeDownloadHandler {
    ctx: HandlerContext,
}

impl TeeDownloadHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl VoteTypeHandler for TeeDownloadHandler {
    fn vote_type(&self) -> VoteType {
        VoteType::TeeDownload
    }

    fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    fn propose(&self, participant: &str, config: Value) -> Result<VoteRequest> {
        let config: TeeDownloadConfig = serde_json::from_value(config)?;
        if config.datatable_id.is_empty() {
            return Err(ApprovalError::InvalidPayload(
                "datatableId must not be empty".to_string(),
            ));
        }
        if participant != config.owner && participant != config.tee_participant {
            return Err(ApprovalError::InvalidPayload(format!(
                "{participant} neither owns datatable {} nor hosts the TEE",
                config.datatable_id
            )));
        }

        let voters = vec![config.owner.clone(), config.tee_participant.clone()];
        let executors = vec![config.tee_participant.clone()];
        let fields = match serde_json::to_value(&config)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        new_vote_request(VoteType::TeeDownload, participant, voters, executors, fields)
    }

    async fn on_quorum_approved(&self, vote_id: &str) -> Result<Vec<SyncPayload>> {
        let request = load_request(&self.ctx, vote_id)?;
        let body = request.request_payload.decode_body()?;
        let config: TeeDownloadConfig = serde_json::from_value(Value::Object(body.fields))?;

        let now = Utc::now();
        let created_at = self
            .ctx
            .store
            .get_tee_datatable_management(vote_id)?
            .map_or(now, |r| r.created_at);
        let record = TeeDatatableManagement {
            management_id: vote_id.to_string(),
            datatable_id: config.datatable_id,
            tee_participant: config.tee_participant,
            owner: config.owner,
            kind: TeeJobKind::Pull,
            status: TeeJobStatus::Success,
            created_at,
            modified_at: now,
        };
        self.ctx.store.upsert_tee_datatable_management(record.clone())?;

        execute(&self.ctx, &request).await?;

        Ok(vec![SyncPayload::TeeDatatableManagement(record)])
    }

    fn title(&self, body: &ProposalBody) -> String {
        format!(
            "TEE {} pulls datatable {}",
            body.field::<String>("teeParticipant").unwrap_or_default(),
            body.field::<String>("datatableId").unwrap_or_default()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::handler_context;
    use crate::topology::Topology;
    use serde_json::json;

    #[tokio::test]
    async fn tee_executes_download() {
        let (ctx, executor) = handler_context(Topology::Hub, "center");
        let handler = TeeDownloadHandler::new(ctx.clone());

        let request = handler
            .propose(
                "alice",
                json!({"datatableId": "dt-9", "teeParticipant": "tee", "owner": "alice"}),
            )
            .unwrap();
        assert_eq!(request.executors, vec!["tee".to_string()]);
        assert_eq!(
            request.request_payload.decode_body().unwrap().voters,
            vec!["alice".to_string(), "tee".to_string()]
        );

        let vote_id = request.vote_id.clone();
        ctx.store.create_vote(request, vec![]).unwrap();
        handler.on_quorum_approved(&vote_id).await.unwrap();

        let record = ctx
            .store
            .get_tee_datatable_management(&vote_id)
            .unwrap()
            .unwrap();
        assert_eq!(record.kind, TeeJobKind::Pull);
        assert_eq!(record.status, TeeJobStatus::Success);
        assert_eq!(record.datatable_id, "dt-9");
        assert_eq!(executor.count(&vote_id), 1);
    }

    #[test]
    fn outsiders_cannot_propose() {
        let (ctx, _) = handler_context(Topology::Hub, "center");
        let handler = TeeDownloadHandler::new(ctx);

        assert!(matches!(
            handler.propose(
                "mallory",
                json!({"datatableId": "dt-9", "teeParticipant": "tee", "owner": "alice"}),
            ),
            Err(ApprovalError::InvalidPayload(_))
        ));
    }
}
