// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Flat address-space browsing.

use tracing::{debug, info, warn};

use opcda_core::{ConnectError, DaResult, ItemId};

use crate::client::transport::{
    RemoteDataSource, RemoteResource, ServerObjectHandle, SessionHandle,
};
use crate::types::ServerSettings;

/// Lists every item identifier of the configured server.
///
/// Opens its own session, independent of any reader, and releases it
/// whether or not the browse succeeded. The whole sequence is bounded by
/// the connect timeout.
pub async fn browse_items<S>(source: &S, settings: &ServerSettings) -> DaResult<Vec<ItemId>>
where
    S: RemoteDataSource + ?Sized,
{
    settings.validate()?;

    let mut session: Option<SessionHandle> = None;
    let mut server: Option<ServerObjectHandle> = None;

    let browse = async {
        let created = source
            .create_session(&settings.domain, &settings.credentials, settings.timeout)
            .await?;
        session = Some(created);
        let connected = source
            .connect(&settings.clsid, &settings.address, created)
            .await?;
        server = Some(connected);
        source.browse_flat(connected).await
    };

    let result = match tokio::time::timeout(settings.timeout, browse).await {
        Ok(Ok(items)) => Ok(items),
        Ok(Err(err)) => {
            warn!(
                address = %settings.address,
                description = %err.describe(),
                "Browse failed: {err}"
            );
            Err(ConnectError::from(err).into())
        }
        Err(_) => {
            warn!(address = %settings.address, "Browse timed out");
            Err(ConnectError::timeout(settings.timeout).into())
        }
    };

    for resource in RemoteResource::teardown_order(session, server, None) {
        if let Err(err) = source.teardown(resource).await {
            debug!(resource = %resource, error = %err, "Browse teardown step failed");
        }
    }

    if let Ok(items) = &result {
        info!(address = %settings.address, items = items.len(), "Browse completed");
    }
    result
}
