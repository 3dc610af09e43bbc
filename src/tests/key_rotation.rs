// Key rotation: an unknown kid triggers exactly one JWKS refresh, and a herd
// of validations for a freshly rotated key shares that refresh.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use futures::future::join_all;
    use httpmock::Method::GET;
    use httpmock::MockServer;

    use crate::error::{InvalidReason, ResolveError};
    use crate::helpers::time::ManualClock;
    use crate::tests::common::keys::{jwks_json, sign_rs256, KID_A, KID_B, PRIVATE_KEY_A, PRIVATE_KEY_B};
    use crate::tests::common::{claims, mock_jwks_endpoint, validator_for};
    use crate::utils::constants::JWKS_ENDPOINT_PATH;

    const NOW: i64 = 1_700_000_000;

    #[tokio::test]
    async fn unknown_kid_refreshes_once_then_gives_up() {
        let server = MockServer::start_async().await;
        let jwks = mock_jwks_endpoint(&server, &[KID_A]);
        let validator = validator_for(&server, Arc::new(ManualClock::new(NOW)));

        let known = sign_rs256(KID_A, PRIVATE_KEY_A, &claims(&server.base_url(), "s", NOW + 60));
        assert!(validator.validate(&known).await.unwrap().is_valid());
        jwks.assert_calls(1);

        let unknown = sign_rs256(KID_B, PRIVATE_KEY_B, &claims(&server.base_url(), "s", NOW + 60));
        let result = validator.validate(&unknown).await.unwrap();
        assert_eq!(result.reason(), Some(InvalidReason::UnknownKey));
        jwks.assert_calls(2);

        // the key set is not emptied by the miss
        assert!(validator.resolver().cache().get(KID_A).is_some());
    }

    #[tokio::test]
    async fn resolver_reports_unknown_key_with_its_id() {
        let server = MockServer::start_async().await;
        mock_jwks_endpoint(&server, &[KID_A]);
        let validator = validator_for(&server, Arc::new(ManualClock::new(NOW)));

        let err = validator.resolver().resolve_key("retired-key").await.unwrap_err();
        assert_eq!(err, ResolveError::UnknownKey("retired-key".to_owned()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn rotated_key_is_picked_up_by_a_single_refresh() {
        let server = MockServer::start_async().await;
        let mut old_set = mock_jwks_endpoint(&server, &[KID_A]);
        let validator = Arc::new(validator_for(&server, Arc::new(ManualClock::new(NOW))));
        validator.resolver().refresh().await.unwrap();
        old_set.assert_calls(1);

        // issuer rotates to key B; the endpoint is slow so the herd overlaps
        old_set.delete();
        let rotated = server.mock(|when, then| {
            when.method(GET).path(JWKS_ENDPOINT_PATH);
            then.status(200)
                .header("Content-Type", "application/json")
                .delay(Duration::from_millis(300))
                .json_body(jwks_json(&[KID_A, KID_B]));
        });

        let token = sign_rs256(KID_B, PRIVATE_KEY_B, &claims(&server.base_url(), "s", NOW + 60));
        let handles: Vec<_> = (0..12)
            .map(|_| {
                let validator = validator.clone();
                let token = token.clone();
                tokio::spawn(async move { validator.validate(&token).await })
            })
            .collect();

        for joined in join_all(handles).await {
            assert!(joined.expect("task panicked").unwrap().is_valid());
        }
        rotated.assert_calls(1);
        assert_eq!(validator.resolver().cache().snapshot().len(), 2);
    }
}
