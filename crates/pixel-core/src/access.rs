//! Plan Access - Tool gating and usage quotas
//!
//! Access is a static table keyed by subscription plan:
//! 1. Basic tools (resize, crop, adjust, text) are open to every plan
//! 2. AI tools (background, ai_extender, ai_edit) require `pro`
//!
//! Quota checks (`can_create_project`, `can_export`) are optimistic here and
//! re-enforced by the store, which is the authority.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default number of projects a free user may own
pub const DEFAULT_FREE_PROJECT_LIMIT: u32 = 3;

/// Default number of exports a free user may make per month
pub const DEFAULT_FREE_EXPORT_LIMIT: u32 = 20;

/// Subscription plan tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Plan {
    /// Free tier with project and export quotas
    #[default]
    Free,
    /// Paid tier, unlimited usage and AI tools
    Pro,
}

impl Plan {
    /// Get the string representation
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Pro => "pro",
        }
    }

    /// Check if this is the paid tier
    #[must_use]
    pub fn is_pro(&self) -> bool {
        matches!(self, Self::Pro)
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = AccessDenial;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(Self::Free),
            "pro" => Ok(Self::Pro),
            other => Err(AccessDenial::UnknownPlan(other.to_string())),
        }
    }
}

/// Editing tool identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolId {
    /// Canvas resize
    Resize,
    /// Image crop
    Crop,
    /// Filter adjustments
    Adjust,
    /// Text objects
    Text,
    /// AI background removal and replacement
    Background,
    /// AI generative extension
    AiExtender,
    /// AI editing
    AiEdit,
}

impl ToolId {
    /// All tools in toolbar order
    pub const ALL: [ToolId; 7] = [
        Self::Resize,
        Self::Crop,
        Self::Adjust,
        Self::Text,
        Self::Background,
        Self::AiExtender,
        Self::AiEdit,
    ];

    /// Get the wire identifier
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Resize => "resize",
            Self::Crop => "crop",
            Self::Adjust => "adjust",
            Self::Text => "text",
            Self::Background => "background",
            Self::AiExtender => "ai_extender",
            Self::AiEdit => "ai_edit",
        }
    }

    /// Human readable toolbar label
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Resize => "Resize",
            Self::Crop => "Crop",
            Self::Adjust => "Adjust",
            Self::Text => "Text",
            Self::Background => "AI Background",
            Self::AiExtender => "AI Image Extender",
            Self::AiEdit => "AI Editing",
        }
    }

    /// Check if the tool is reserved for the pro plan
    #[must_use]
    pub fn is_pro_only(&self) -> bool {
        matches!(self, Self::Background | Self::AiExtender | Self::AiEdit)
    }
}

impl Default for ToolId {
    fn default() -> Self {
        Self::Resize
    }
}

impl fmt::Display for ToolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolId {
    type Err = AccessDenial;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| AccessDenial::UnknownTool(s.to_string()))
    }
}

/// Reason an action was refused by the access gate
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccessDenial {
    /// Tool needs a higher plan
    #[error("tool '{0}' is only available on the pro plan")]
    ProOnly(ToolId),

    /// Free plan project quota reached
    #[error("free plan limited to {limit} projects")]
    ProjectLimit {
        /// Configured project limit
        limit: u32,
    },

    /// Free plan monthly export quota reached
    #[error("free plan limited to {limit} exports per month")]
    ExportLimit {
        /// Configured export limit
        limit: u32,
    },

    /// Tool identifier not recognised
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Plan identifier not recognised
    #[error("unknown plan: {0}")]
    UnknownPlan(String),
}

impl AccessDenial {
    /// Get error code for protocol messages
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::ProOnly(_) => "upgrade_required",
            Self::ProjectLimit { .. } | Self::ExportLimit { .. } => "plan_limit",
            Self::UnknownTool(_) => "unknown_tool",
            Self::UnknownPlan(_) => "unknown_plan",
        }
    }

    /// Check if the denial should route the user to an upgrade prompt
    #[must_use]
    pub fn wants_upgrade(&self) -> bool {
        matches!(
            self,
            Self::ProOnly(_) | Self::ProjectLimit { .. } | Self::ExportLimit { .. }
        )
    }
}

/// Usage thresholds applied to the free plan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    /// Maximum projects owned by a free user
    #[serde(default = "default_free_project_limit")]
    pub free_project_limit: u32,
    /// Maximum exports per month for a free user
    #[serde(default = "default_free_export_limit")]
    pub free_export_limit: u32,
}

fn default_free_project_limit() -> u32 {
    DEFAULT_FREE_PROJECT_LIMIT
}

fn default_free_export_limit() -> u32 {
    DEFAULT_FREE_EXPORT_LIMIT
}

impl Default for PlanLimits {
    fn default() -> Self {
        Self {
            free_project_limit: DEFAULT_FREE_PROJECT_LIMIT,
            free_export_limit: DEFAULT_FREE_EXPORT_LIMIT,
        }
    }
}

/// Access table for a single plan
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlanAccess {
    plan: Plan,
    limits: PlanLimits,
}

impl PlanAccess {
    /// Create the access table for a plan with default limits
    #[must_use]
    pub fn new(plan: Plan) -> Self {
        Self::with_limits(plan, PlanLimits::default())
    }

    /// Create the access table for a plan with custom limits
    #[must_use]
    pub fn with_limits(plan: Plan, limits: PlanLimits) -> Self {
        Self { plan, limits }
    }

    /// The plan this table was built for
    #[must_use]
    pub fn plan(&self) -> Plan {
        self.plan
    }

    /// The limits in effect
    #[must_use]
    pub fn limits(&self) -> PlanLimits {
        self.limits
    }

    /// Check if the plan may use a tool
    #[must_use]
    pub fn has_access(&self, tool: ToolId) -> bool {
        self.plan.is_pro() || !tool.is_pro_only()
    }

    /// Check tool access, returning the denial reason
    pub fn check_tool(&self, tool: ToolId) -> Result<(), AccessDenial> {
        if self.has_access(tool) {
            Ok(())
        } else {
            Err(AccessDenial::ProOnly(tool))
        }
    }

    /// Tools the plan may not use, in toolbar order
    #[must_use]
    pub fn restricted_tools(&self) -> Vec<ToolId> {
        ToolId::ALL
            .into_iter()
            .filter(|tool| !self.has_access(*tool))
            .collect()
    }

    /// Check if another project may be created given the current count
    #[must_use]
    pub fn can_create_project(&self, current_count: u32) -> bool {
        self.plan.is_pro() || current_count < self.limits.free_project_limit
    }

    /// Check project quota, returning the denial reason
    pub fn check_create_project(&self, current_count: u32) -> Result<(), AccessDenial> {
        if self.can_create_project(current_count) {
            Ok(())
        } else {
            Err(AccessDenial::ProjectLimit {
                limit: self.limits.free_project_limit,
            })
        }
    }

    /// Check if another export may be made given this month's count
    #[must_use]
    pub fn can_export(&self, current_count: u32) -> bool {
        self.plan.is_pro() || current_count < self.limits.free_export_limit
    }

    /// Check export quota, returning the denial reason
    pub fn check_export(&self, current_count: u32) -> Result<(), AccessDenial> {
        if self.can_export(current_count) {
            Ok(())
        } else {
            Err(AccessDenial::ExportLimit {
                limit: self.limits.free_export_limit,
            })
        }
    }
}

#[cfg(test)]
mod tests;
