//! Property-based coverage of the issue/verify round trip across randomly
//! generated subjects, usernames, and role lists.

use std::sync::Arc;

use proptest::prelude::*;
use token_engine::{
    AlgorithmId, InMemoryTokenRepository, MakerConfig, Signer, SignerConfig, SigningScheme,
    TokenError, TokenMaker, TokenRepository,
};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

fn uuid_strategy() -> impl Strategy<Value = Uuid> {
    any::<[u8; 16]>().prop_map(Uuid::from_bytes)
}

fn username_strategy() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_]{1,64}"
}

fn roles_strategy() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-z]{1,16}", 1..5)
}

fn maker() -> TokenMaker {
    let signer_config = SignerConfig {
        scheme: SigningScheme::Symmetric,
        algorithm: AlgorithmId::Hs256,
        allowed_algorithms: vec![],
    };
    let signer = Signer::new_symmetric(&signer_config, &[b'k'; 32]).unwrap();
    let repo: Arc<dyn TokenRepository> = Arc::new(InMemoryTokenRepository::new());
    TokenMaker::new(MakerConfig::default(), signer, Some(repo)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn access_token_verification_always_echoes_its_issuance_inputs(
        subject in uuid_strategy(),
        username in username_strategy(),
        roles in roles_strategy(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let maker = maker();
            let issued = maker
                .issue_access(subject, &username, roles.clone(), None)
                .unwrap();

            let cancel = CancellationToken::new();
            let claims = maker.verify_access(&issued.token, &cancel).await.unwrap();

            prop_assert_eq!(claims.subject, subject);
            prop_assert_eq!(claims.username, username);
            prop_assert_eq!(claims.roles, roles);
            prop_assert!(claims.timestamps.expires_at > claims.timestamps.issued_at);
            Ok(())
        })?;
    }

    #[test]
    fn revoking_an_access_token_always_makes_it_unverifiable(
        subject in uuid_strategy(),
        username in username_strategy(),
        roles in roles_strategy(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let maker = maker();
            let issued = maker.issue_access(subject, &username, roles, None).unwrap();

            maker.revoke_access(&issued.token).await.unwrap();

            let cancel = CancellationToken::new();
            let result = maker.verify_access(&issued.token, &cancel).await;
            prop_assert!(matches!(result, Err(TokenError::Revoked)));
            Ok(())
        })?;
    }

    #[test]
    fn nil_subject_is_always_rejected_regardless_of_other_fields(
        username in username_strategy(),
        roles in roles_strategy(),
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            let maker = maker();
            let result = maker.issue_access(Uuid::nil(), &username, roles, None);
            prop_assert!(matches!(result, Err(TokenError::InvalidArgument(_))));
            Ok(())
        })?;
    }
}
