// Copyright 2022-2023 Protocol Labs
// SPDX-License-Identifier: MIT
//! Votes on a network route between two participants.

use approval_sdk::{NodeRoute, ProposalBody, RouteStatus, SyncPayload, VoteRequest, VoteType};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{ApprovalError, Result};
use crate::registry::{execute, load_request, new_vote_request, HandlerContext, VoteTypeHandler};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRouteConfig {
    pub src_participant: String,
    pub dst_participant: String,
    pub dst_address: String,
}

/// Both route ends vote. Ends that cannot hold a signing key, e.g. TEE hosts, are listed as
/// executors and reply without a signature.
pub struct NodeRouteHandler {
    ctx: HandlerContext,
}

impl NodeRouteHandler {
    pub fn new(ctx: HandlerContext) -> Self {
        Self { ctx }
    }

    fn route_of(request: &VoteRequest) -> Result<NodeRoute> {
        let body = request.request_payload.decode_body()?;
        let field = |name: &str| {
            body.field::<String>(name)
                .ok_or_else(|| ApprovalError::InvalidPayload(format!("route proposal lacks {name}")))
        };
        let src = field("srcParticipant")?;
        let dst = field("dstParticipant")?;
        let now = Utc::now();

        Ok(NodeRoute {
            route_id: NodeRoute::route_id_of(&src, &dst),
            src_participant: src,
            dst_participant: dst,
            dst_address: field("dstAddress")?,
            status: RouteStatus::Succeeded,
            created_at: now,
            modified_at: now,
        })
    }
}

#[async_trait]
impl VoteTypeHandler for NodeRouteHandler {
    fn vote_type(&self) -> VoteType {
        VoteType::NodeRoute
    }

    fn context(&self) -> &HandlerContext {
        &self.ctx
    }

    fn propose(&self, participant: &str, config: Value) -> Result<VoteRequest> {
        let config: NodeRouteConfig = serde_json::from_value(config)?;

        if config.src_participant == config.dst_participant {
            return Err(ApprovalError::InvalidPayload(
                "a route needs two distinct participants".to_string(),
            ));
        }
        if participant != config.src_participant && participant != config.dst_participant {
            return Err(ApprovalError::InvalidPayload(format!(
                "{participant} is not an end of the proposed route"
            )));
        }

        let ends = vec![config.src_participant.clone(), config.dst_participant.clone()];
        let executors = ends
            .iter()
            .filter(|p| !self.ctx.topology.can_sign(p.as_str()))
            .cloned()
            .collect();

        let fields = match serde_json::to_value(&config)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };

        new_vote_request(VoteType::NodeRoute, participant, ends, executors, fields)
    }

    async fn on_quorum_approved(&self, vote_id: &str) -> Result<Vec<SyncPayload>> {
        let request = load_request(&self.ctx, vote_id)?;
        let mut route = Self::route_of(&request)?;

        if let Some(existing) = self.ctx.store.get_route(&route.route_id)? {
            route.created_at = existing.created_at;
        }
        self.ctx.store.upsert_route(route.clone())?;
        log::info!("route {} approved by vote {vote_id}", route.route_id);

        if let Err(e) = execute(&self.ctx, &request).await {
            route.status = RouteStatus::Failed;
            route.modified_at = Utc::now();
            self.ctx.store.upsert_route(route)?;
            return Err(e);
        }

        Ok(vec![SyncPayload::NodeRoute(route)])
    }

    fn title(&self, body: &ProposalBody) -> String {
        format!(
            "Route {} -> {}",
            body.field::<String>("srcParticipant").unwrap_or_default(),
            body.field::<String>("dstParticipant").unwrap_or_default()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::handler_context_with;
    use crate::topology::{StaticTopology, Topology};
    use serde_json::json;

    fn config() -> Value {
        json!({"srcParticipant": "alice", "dstParticipant": "tee", "dstAddress": "10.0.0.7:50051"})
    }

    #[test]
    fn non_signing_ends_execute() {
        let topology = StaticTopology::new(Topology::Hub, "center").with_non_signing("tee");
        let (ctx, _) = handler_context_with(topology);
        let handler = NodeRouteHandler::new(ctx);

        let request = handler.propose("alice", config()).unwrap();
        assert_eq!(request.vote_type, VoteType::NodeRoute);
        assert_eq!(request.executors, vec!["tee".to_string()]);

        let body = request.request_payload.decode_body().unwrap();
        assert_eq!(body.voters, vec!["alice".to_string(), "tee".to_string()]);
        assert_eq!(body.field::<String>("dstAddress").unwrap(), "10.0.0.7:50051");
        assert_eq!(handler.title(&body), "Route alice -> tee");
    }

    #[test]
    fn rejects_foreign_routes() {
        let (ctx, _) = handler_context_with(StaticTopology::new(Topology::Hub, "center"));
        let handler = NodeRouteHandler::new(ctx);

        assert!(matches!(
            handler.propose("mallory", config()),
            Err(ApprovalError::InvalidPayload(_))
        ));
        assert!(matches!(
            handler.propose(
                "alice",
                json!({"srcParticipant": "alice", "dstParticipant": "alice", "dstAddress": "x"})
            ),
            Err(ApprovalError::InvalidPayload(_))
        ));
        assert!(matches!(
            handler.propose("alice", json!({"srcParticipant": "alice"})),
            Err(ApprovalError::InvalidPayload(_))
        ));
    }

    #[tokio::test]
    async fn approval_upserts_route() {
        let (ctx, executor) =
            handler_context_with(StaticTopology::new(Topology::Hub, "center"));
        let handler = NodeRouteHandler::new(ctx.clone());

        let request = handler.propose("alice", config()).unwrap();
        let vote_id = request.vote_id.clone();
        ctx.store.create_vote(request, vec![]).unwrap();

        let records = handler.on_quorum_approved(&vote_id).await.unwrap();
        assert_eq!(records.len(), 1);

        let route = ctx.store.get_route("alice->tee").unwrap().unwrap();
        assert_eq!(route.status, RouteStatus::Succeeded);
        assert_eq!(route.dst_address, "10.0.0.7:50051");
        assert_eq!(executor.count(&vote_id), 1);
    }

    #[tokio::test]
    async fn failed_execution_marks_route() {
        let (ctx, executor) =
            handler_context_with(StaticTopology::new(Topology::Hub, "center"));
        executor.fail_with("no capacity");
        let handler = NodeRouteHandler::new(ctx.clone());

        let request = handler.propose("alice", config()).unwrap();
        let vote_id = request.vote_id.clone();
        ctx.store.create_vote(request, vec![]).unwrap();

        assert!(matches!(
            handler.on_quorum_approved(&vote_id).await,
            Err(ApprovalError::Execution { .. })
        ));
        assert_eq!(
            ctx.store.get_route("alice->tee").unwrap().unwrap().status,
            RouteStatus::Failed
        );
    }
}
