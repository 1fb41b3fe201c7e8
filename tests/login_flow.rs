mod common;

use bewell_ussd::config::UssdConfig;
use bewell_ussd::storage::{NewProfile, ProfileStore};
use common::{Harness, PHONE, PIN};

const GENERIC: &str = "END Something went wrong. Please try again.";

#[tokio::test]
async fn empty_input_greets_by_name() {
    let h = Harness::new();
    h.register(PHONE, PIN, false).await;
    let mut d = h.dial("s-login-1", PHONE);

    let reply = d.start().await;
    assert!(reply.starts_with("CON Welcome back to Be.Well, Jane."), "{reply}");
    assert!(reply.contains("00. Forgot PIN?"));
    assert_eq!(h.level("s-login-1").await, 0);
}

#[tokio::test]
async fn correct_pin_opens_home_menu() {
    let h = Harness::new();
    h.register(PHONE, PIN, false).await;
    let mut d = h.dial("s-login-2", PHONE);
    d.start().await;

    let reply = d.send(PIN).await;
    assert_eq!(reply, "CON Welcome to Be.Well\r\n1. Opt out of marketing messages\r\n2. Change PIN");
    assert_eq!(h.level("s-login-2").await, 5);
}

#[tokio::test]
async fn wrong_pin_reprompts_and_stays_at_login() {
    let h = Harness::new();
    h.register(PHONE, PIN, false).await;
    let mut d = h.dial("s-login-3", PHONE);
    d.start().await;

    let reply = d.send("9999").await;
    assert!(reply.starts_with("CON The PIN you entered is not correct"), "{reply}");
    let session = h.session("s-login-3").await;
    assert_eq!(session.level, 0);
    assert_eq!(session.failed_pin_attempts, 1);

    // A later correct PIN still works and clears the counter
    let reply = d.send(PIN).await;
    assert!(reply.starts_with("CON Welcome to Be.Well"));
    assert_eq!(h.session("s-login-3").await.failed_pin_attempts, 0);
}

#[tokio::test]
async fn forgot_pin_moves_to_date_of_birth_prompt() {
    let h = Harness::new();
    h.register(PHONE, PIN, false).await;
    let mut d = h.dial("s-login-4", PHONE);
    d.start().await;

    let reply = d.send("00").await;
    assert!(reply.starts_with("CON Please enter your date of birth"), "{reply}");
    assert_eq!(h.level("s-login-4").await, 10);
}

#[tokio::test]
async fn temporary_pin_forces_a_new_pin() {
    let h = Harness::new();
    h.register(PHONE, PIN, true).await;
    let mut d = h.dial("s-login-5", PHONE);
    d.start().await;

    let reply = d.send(PIN).await;
    assert!(reply.starts_with("CON Your PIN is temporary."), "{reply}");
    assert_eq!(h.level("s-login-5").await, 51);
}

#[tokio::test]
async fn repeated_wrong_pins_end_the_session() {
    let h = Harness::new();
    h.register(PHONE, PIN, false).await;
    let mut d = h.dial("s-login-6", PHONE);
    d.start().await;

    assert!(d.send("1111").await.starts_with("CON "));
    assert!(d.send("2222").await.starts_with("CON "));
    let reply = d.send("3333").await;
    assert!(reply.starts_with("END You have entered a wrong PIN too many times."), "{reply}");
}

#[tokio::test]
async fn locked_session_refuses_the_correct_pin_and_reset() {
    let h = Harness::new();
    h.register(PHONE, PIN, false).await;
    let mut d = h.dial("s-login-10", PHONE);
    d.start().await;
    for wrong in ["1111", "2222", "3333"] {
        d.send(wrong).await;
    }

    let reply = d.send(PIN).await;
    assert!(reply.starts_with("END You have entered a wrong PIN too many times."), "{reply}");
    assert!(d.send("00").await.starts_with("END "));
    let session = h.session("s-login-10").await;
    assert_eq!(session.level, 0);
    assert_eq!(session.failed_pin_attempts, 3);

    // A new dial gets a fresh session
    let mut fresh = h.dial("s-login-11", PHONE);
    fresh.start().await;
    assert!(fresh.send(PIN).await.starts_with("CON Welcome to Be.Well"));
}

#[tokio::test]
async fn lockout_can_be_disabled() {
    let h = Harness::with_settings(UssdConfig {
        max_login_attempts: 0,
        ..UssdConfig::default()
    });
    h.register(PHONE, PIN, false).await;
    let mut d = h.dial("s-login-7", PHONE);
    d.start().await;

    for _ in 0..10 {
        assert!(d.send("0000").await.starts_with("CON The PIN you entered is not correct"));
    }
    assert_eq!(h.session("s-login-7").await.failed_pin_attempts, 10);
}

#[tokio::test]
async fn profile_without_pin_record_fails_generically() {
    let h = Harness::new();
    h.storage
        .create_profile(NewProfile {
            phone_number: PHONE.to_string(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            date_of_birth: None,
        })
        .await
        .unwrap();
    let mut d = h.dial("s-login-8", PHONE);
    d.start().await;

    assert_eq!(d.send(PIN).await, GENERIC);
}

#[tokio::test]
async fn national_format_numbers_reach_the_same_profile() {
    let h = Harness::new();
    h.register(PHONE, PIN, false).await;
    let mut d = h.dial("s-login-9", "0712345678");

    assert!(d.start().await.starts_with("CON Welcome back to Be.Well, Jane."));
    assert!(d.send(PIN).await.starts_with("CON Welcome to Be.Well"));
}
