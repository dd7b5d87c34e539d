// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Active agent: an in-memory pool entry (spec §3). The cancellation handle
//! itself lives in `collabot-engine`'s pool, not here — `collabot-core` stays
//! adapter/runtime agnostic, same layering the teacher keeps between
//! `oj_core::Job` (no tokio handles) and `oj_engine::Executor` (owns them).

use crate::ids::{DispatchId, RoleName, TaskSlug};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveAgent {
    pub dispatch_id: DispatchId,
    pub role: RoleName,
    pub task_slug: TaskSlug,
    pub started_at: DateTime<Utc>,
}

impl ActiveAgent {
    pub fn new(
        dispatch_id: DispatchId,
        role: RoleName,
        task_slug: TaskSlug,
        started_at: DateTime<Utc>,
    ) -> Self {
        Self {
            dispatch_id,
            role,
            task_slug,
            started_at,
        }
    }
}
