use std::sync::Arc;

use bewell_ussd::config::UssdConfig;
use bewell_ussd::crm::MarketingCrm;
use bewell_ussd::pin::{HashFunction, PinOptions};
use bewell_ussd::storage::file::FileStorage;
use bewell_ussd::storage::ProfileStore;
use bewell_ussd::ussd::{Collaborators, UssdEngine, UssdRequest};

const PHONE: &str = "+254712345678";

#[tokio::test]
async fn signup_login_and_opt_out_persist_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let storage = Arc::new(FileStorage::new(dir.path()).await.unwrap());
    let options = PinOptions {
        salt_len: 16,
        iterations: 1,
        key_len: 32,
        hash: HashFunction::Sha256,
    };
    let engine = UssdEngine::new(
        Collaborators::from_storage(storage.clone(), storage.clone()),
        options,
        UssdConfig::default(),
    )
    .unwrap();

    let mut text = String::new();
    for input in ["", "Amina", "Wanjiru", "01012000", "2468", "2468"] {
        if !input.is_empty() {
            if !text.is_empty() {
                text.push('*');
            }
            text.push_str(input);
        }
        engine.handle(&UssdRequest::new("ATUid_f1", PHONE, text.clone())).await;
    }
    let profile = storage.get_profile_by_phone(PHONE).await.unwrap().expect("profile on disk");
    assert_eq!(profile.first_name, "Amina");

    let login = engine.handle(&UssdRequest::new("ATUid_f2", PHONE, "2468")).await;
    assert!(login.to_string().starts_with("CON Welcome to Be.Well"), "{login}");
    let toggled = engine.handle(&UssdRequest::new("ATUid_f2", PHONE, "2468*1")).await;
    assert!(toggled.to_string().contains("out of marketing messages"));

    let reopened = FileStorage::new(dir.path()).await.unwrap();
    assert!(reopened.is_opted_out(PHONE).await.unwrap());
    let events = std::fs::read_to_string(dir.path().join("events.jsonl")).unwrap();
    assert!(events.contains("COMPLETED_REGISTRATION"));
    assert!(events.contains("OPTED_OUT_OF_MARKETING"));
}
