//! Claim-once guarantees against a file-backed pool shared by independent
//! connection pools, the way separate server processes would share it.

use std::sync::Arc;

use solvanity_pool::{ClaimOutcome, Keypair, PoolService, SecretCipher, SqlitePoolStore};
use tempfile::TempDir;

const SECRET: &str = "integration-test-pool-secret";

async fn open_service(dir: &TempDir) -> PoolService {
    let url = format!("sqlite://{}", dir.path().join("pool.db").display());
    let store = SqlitePoolStore::connect(&url, 4).await.unwrap();
    PoolService::new(Arc::new(store), SecretCipher::from_secret(SECRET).unwrap())
}

async fn donate(service: &PoolService, suffix: &str) -> Keypair {
    let keypair = Keypair::generate();
    service
        .donate(
            Some(suffix),
            keypair.public_identifier(),
            keypair.secret_material().as_slice(),
        )
        .await
        .unwrap();
    keypair
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_entry_claimed_exactly_once() {
    let dir = tempfile::tempdir().unwrap();
    // Two services over separate connection pools.
    let a = open_service(&dir).await;
    let b = open_service(&dir).await;

    for _ in 0..20 {
        donate(&a, "xyz").await;

        let (first, second) = tokio::join!(
            tokio::spawn({
                let a = a.clone();
                async move { a.claim(Some("xyz")).await.unwrap() }
            }),
            tokio::spawn({
                let b = b.clone();
                async move { b.claim(Some("xyz")).await.unwrap() }
            }),
        );
        let claimed = [first.unwrap(), second.unwrap()]
            .iter()
            .filter(|outcome| outcome.is_claimed())
            .count();
        assert_eq!(claimed, 1);
        assert_eq!(a.available(Some("xyz")).await.unwrap(), 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_claims_never_duplicate() {
    let dir = tempfile::tempdir().unwrap();
    let service = open_service(&dir).await;

    let mut donated = Vec::new();
    for _ in 0..10 {
        donated.push(donate(&service, "moon").await.public_identifier().to_string());
    }

    let tasks: Vec<_> = (0..16)
        .map(|_| {
            let service = service.clone();
            tokio::spawn(async move { service.claim(Some("moon")).await.unwrap() })
        })
        .collect();

    let mut claimed = Vec::new();
    for task in tasks {
        if let ClaimOutcome::Claimed(keypair) = task.await.unwrap() {
            claimed.push(keypair.public_identifier().to_string());
        }
    }

    claimed.sort();
    donated.sort();
    assert_eq!(claimed, donated);
}

#[tokio::test]
async fn test_fifo_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let order = {
        let service = open_service(&dir).await;
        let mut order = Vec::new();
        for _ in 0..3 {
            order.push(donate(&service, "abc").await.public_identifier().to_string());
        }
        order
    };

    let service = open_service(&dir).await;
    for expected in order {
        let keypair = service
            .claim(Some("abc"))
            .await
            .unwrap()
            .into_keypair()
            .unwrap();
        assert_eq!(keypair.public_identifier(), expected);
    }
    assert!(!service.claim(Some("abc")).await.unwrap().is_claimed());
}
