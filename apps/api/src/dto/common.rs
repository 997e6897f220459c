use std::collections::BTreeMap;

use gatehouse_domain::CapabilityMap;
use serde::Serialize;
use ts_rs::TS;

/// Health check response.
#[derive(Debug, Serialize, TS)]
#[ts(export, export_to = "../../packages/api-types/src/generated/health-response.ts")]
pub struct HealthResponse {
    pub status: String,
}

/// API representation of one resource's capability flags.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../packages/api-types/src/generated/capability-flags-response.ts"
)]
pub struct CapabilityFlagsResponse {
    pub create: bool,
    pub read: bool,
    pub update: bool,
    pub delete: bool,
}

/// Renders a capability map as resource-keyed flag objects.
pub fn capability_map_response(
    capabilities: &CapabilityMap,
) -> BTreeMap<String, CapabilityFlagsResponse> {
    capabilities
        .iter()
        .map(|(resource, flags)| {
            (
                resource.as_str().to_owned(),
                CapabilityFlagsResponse {
                    create: flags.create,
                    read: flags.read,
                    update: flags.update,
                    delete: flags.delete,
                },
            )
        })
        .collect()
}
