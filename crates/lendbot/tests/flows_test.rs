//! End-to-end conversations through the router
//!
//! Run with: cargo test -p lendbot --test flows_test

mod common;

use common::*;
use lendbot::telegram::Outcome;
use lendcore::session::lifecycle::{self, SessionState};
use lendcore::session::topic::{FlowMode, RequestType, Topic};
use lendcore::storage::borrows::{self, BorrowStatus, Decision};
use lendcore::storage::{tools, users};
use pretty_assertions::assert_eq;

fn is_idle(env: &TestEnv, user_id: i64) -> bool {
    lifecycle::state_for(&env.conn(), user_id, RequestType::Private).unwrap() == SessionState::Idle
}

#[test]
fn test_borrow_confirm_and_return() {
    let env = TestEnv::new();
    env.register(STUDENT, "Budi Santoso");
    let tool_id = env.add_tool("Oscilloscope", 2);

    let routed = env.send(STUDENT, "/pinjam");
    assert_eq!(routed.outcome, Outcome::Opened(FlowMode::Borrow));
    assert_eq!(buttons_to(&routed, STUDENT), vec![tool_id.to_string()]);

    let routed = env.press(STUDENT, &tool_id.to_string());
    assert_eq!(routed.outcome, Outcome::Advanced(Topic::BorrowDate));
    assert_eq!(texts_to(&routed, STUDENT), vec!["For how many days? (1-90)".to_string()]);

    let routed = env.send(STUDENT, "30");
    assert_eq!(routed.outcome, Outcome::Advanced(Topic::BorrowConfirm));
    let summary = all_text(&routed);
    assert!(summary.contains("Borrow Oscilloscope for 30 days."), "{}", summary);
    assert_eq!(buttons_to(&routed, STUDENT), vec!["ya", "tidak"]);

    let routed = env.press(STUDENT, "ya");
    assert_eq!(routed.outcome, Outcome::Finalized(FlowMode::Borrow));
    assert!(is_idle(&env, STUDENT));

    let borrow = borrows::list_user_borrows(&env.conn(), STUDENT).unwrap().remove(0);
    assert_eq!(borrow.status, BorrowStatus::Requested);
    assert_eq!(borrow.duration_days, 30);
    assert_eq!(
        texts_to(&routed, STUDENT),
        vec![format!("Borrow request #{} was sent. Lab staff will confirm it.", borrow.id)]
    );

    let staff_texts = texts_to(&routed, STAFF_CHAT);
    assert_eq!(staff_texts.len(), 1);
    assert!(staff_texts[0].contains("Budi Santoso"));
    assert_eq!(
        buttons_to(&routed, STAFF_CHAT),
        vec![
            format!("staff:borrow:confirm:{}", borrow.id),
            format!("staff:borrow:reject:{}", borrow.id)
        ]
    );

    // Staff confirms from the staff chat
    let routed = env.press_in_staff_chat(STAFF, &format!("staff:borrow:confirm:{}", borrow.id));
    assert_eq!(routed.outcome, Outcome::StaffDecision(Decision::Applied));
    assert_eq!(tools::get_tool(&env.conn(), tool_id).unwrap().unwrap().stock, 1);
    assert!(texts_to(&routed, STUDENT)[0].contains("was approved"));

    // A second press changes nothing
    let routed = env.press_in_staff_chat(STAFF, &format!("staff:borrow:confirm:{}", borrow.id));
    assert_eq!(routed.outcome, Outcome::StaffDecision(Decision::NotPending));
    assert_eq!(tools::get_tool(&env.conn(), tool_id).unwrap().unwrap().stock, 1);

    // Return it
    let routed = env.send(STUDENT, "/kembali");
    assert_eq!(routed.outcome, Outcome::Opened(FlowMode::Return));
    assert_eq!(buttons_to(&routed, STUDENT), vec![borrow.id.to_string()]);

    let routed = env.send(STUDENT, &format!("#{}", borrow.id));
    assert_eq!(routed.outcome, Outcome::Advanced(Topic::ReturnConfirm));

    let routed = env.send(STUDENT, "yes");
    assert_eq!(routed.outcome, Outcome::Finalized(FlowMode::Return));
    let confirm_return = buttons_to(&routed, STAFF_CHAT);
    assert_eq!(confirm_return.len(), 1);
    let returning_id: i64 = confirm_return[0].rsplit(':').next().unwrap().parse().unwrap();

    // Nothing left to return while the return is pending
    let routed = env.send(STUDENT, "/kembali");
    assert_eq!(routed.outcome, Outcome::Denied);

    let routed = env.send(STAFF, &format!("/terima {}", returning_id));
    assert_eq!(routed.outcome, Outcome::StaffDecision(Decision::Applied));
    assert_eq!(tools::get_tool(&env.conn(), tool_id).unwrap().unwrap().stock, 2);
    assert_eq!(
        borrows::get_borrow(&env.conn(), borrow.id).unwrap().unwrap().status,
        BorrowStatus::Returned
    );
}

#[test]
fn test_borrow_topics_name_the_pending_question() {
    let env = TestEnv::new();
    env.register(STUDENT, "Budi Santoso");
    let tool_id = env.add_tool("Oscilloscope", 2);

    let current = |env: &TestEnv| {
        let conn = env.conn();
        let session = lifecycle::current_for(&conn, STUDENT, RequestType::Private)
            .unwrap()
            .unwrap();
        lifecycle::current_topic(&conn, &session).unwrap()
    };

    env.send(STUDENT, "/pinjam");
    assert_eq!(current(&env), Some(Topic::BorrowInit));
    env.send(STUDENT, &tool_id.to_string());
    assert_eq!(current(&env), Some(Topic::BorrowDate));
    env.send(STUDENT, "30");
    assert_eq!(current(&env), Some(Topic::BorrowConfirm));

    // An invalid answer leaves the topic where it was
    let routed = env.send(STUDENT, "maybe");
    assert_eq!(routed.outcome, Outcome::Reprompted(Topic::BorrowConfirm));
    assert_eq!(current(&env), Some(Topic::BorrowConfirm));

    assert_eq!(env.send(STUDENT, "yes").outcome, Outcome::Finalized(FlowMode::Borrow));
    assert!(is_idle(&env, STUDENT));
}

#[test]
fn test_rejected_borrow_keeps_stock() {
    let env = TestEnv::new();
    env.register(STUDENT, "Budi Santoso");
    let tool_id = env.add_tool("Soldering iron", 1);

    env.send(STUDENT, "/pinjam");
    env.send(STUDENT, &tool_id.to_string());
    env.send(STUDENT, "7");
    env.send(STUDENT, "ya");
    let borrow = borrows::list_user_borrows(&env.conn(), STUDENT).unwrap().remove(0);

    let routed = env.send(STAFF, &format!("/tolak {}", borrow.id));
    assert_eq!(routed.outcome, Outcome::StaffDecision(Decision::Applied));
    assert!(texts_to(&routed, STUDENT)[0].contains("was rejected"));
    assert_eq!(tools::get_tool(&env.conn(), tool_id).unwrap().unwrap().stock, 1);

    let routed = env.send(STUDENT, "/status");
    assert!(all_text(&routed).contains("Soldering iron, 7 days: rejected"));
}

#[test]
fn test_registration_with_reprompt_and_decline() {
    let env = TestEnv::new();
    env.add_tool("Oscilloscope", 1);

    let routed = env.send(STUDENT, "/pinjam");
    assert_eq!(routed.outcome, Outcome::Denied);
    assert_eq!(all_text(&routed), "Please register with /daftar first.");

    assert_eq!(env.send(STUDENT, "/daftar").outcome, Outcome::Opened(FlowMode::Register));
    assert_eq!(env.send(STUDENT, "Budi Santoso").outcome, Outcome::Advanced(Topic::RegisterNim));
    assert_eq!(env.send(STUDENT, "5025201001").outcome, Outcome::Advanced(Topic::RegisterBatch));

    let routed = env.send(STUDENT, "1999");
    assert_eq!(routed.outcome, Outcome::Reprompted(Topic::RegisterBatch));
    let text = all_text(&routed);
    assert!(text.starts_with("1999 is not allowed"), "{}", text);
    assert!(text.contains("What is your batch year?"));

    assert_eq!(env.send(STUDENT, "2021").outcome, Outcome::Advanced(Topic::RegisterConfirm));

    let routed = env.send(STUDENT, "tidak");
    assert_eq!(routed.outcome, Outcome::Declined(FlowMode::Register));
    assert!(!users::get_user(&env.conn(), STUDENT).unwrap().unwrap().registered);
    assert!(is_idle(&env, STUDENT));

    env.send(STUDENT, "/daftar");
    env.send(STUDENT, "Budi Santoso");
    env.send(STUDENT, "5025201001");
    env.send(STUDENT, "2021");
    let routed = env.send(STUDENT, "ya");
    assert_eq!(routed.outcome, Outcome::Finalized(FlowMode::Register));

    let user = users::get_user(&env.conn(), STUDENT).unwrap().unwrap();
    assert!(user.registered);
    assert_eq!(user.name.as_deref(), Some("Budi Santoso"));
    assert_eq!(user.nim.as_deref(), Some("5025201001"));
    assert_eq!(user.batch_year, Some(2021));

    assert_eq!(env.send(STUDENT, "/daftar").outcome, Outcome::Denied);
}

#[test]
fn test_staff_adds_tool_with_photos() {
    let env = TestEnv::new();

    assert_eq!(env.send(STAFF, "/tambah").outcome, Outcome::Opened(FlowMode::Add));
    assert_eq!(env.send(STAFF, "Multimeter").outcome, Outcome::Advanced(Topic::ManageAddBrand));
    env.send(STAFF, "Sanwa");
    env.send(STAFF, "Digital");
    assert_eq!(env.send(STAFF, "0,4").outcome, Outcome::Advanced(Topic::ManageAddStock));
    assert_eq!(env.send(STAFF, "5").outcome, Outcome::Advanced(Topic::ManageAddInfo));
    assert_eq!(env.press(STAFF, "selesai").outcome, Outcome::Advanced(Topic::ManageAddPhoto));

    // Text where a photo is expected
    let routed = env.send(STAFF, "here it is");
    assert_eq!(routed.outcome, Outcome::Reprompted(Topic::ManageAddPhoto));

    let routed = env.send_photo(STAFF, "front", None);
    assert_eq!(routed.outcome, Outcome::Advanced(Topic::ManageAddPhoto));
    assert!(all_text(&routed).contains("1 so far"));

    let routed = env.press(STAFF, "selesai");
    assert_eq!(routed.outcome, Outcome::Advanced(Topic::ManageAddConfirm));
    let summary = all_text(&routed);
    assert!(summary.contains("New tool: Multimeter"));
    assert!(summary.contains("Weight: 0.4 kg"));
    assert!(summary.contains("Info: -"));

    let routed = env.press(STAFF, "ya");
    assert_eq!(routed.outcome, Outcome::Finalized(FlowMode::Add));

    let conn = env.conn();
    let tool = tools::list_tools(&conn).unwrap().remove(0);
    assert_eq!(tool.name, "Multimeter");
    assert_eq!(tool.brand, "Sanwa");
    assert_eq!(tool.stock, 5);
    assert!((tool.weight - 0.4).abs() < f64::EPSILON);
    assert_eq!(tool.info, "");

    let photos = tools::get_tool_photos(&conn, tool.id).unwrap();
    assert_eq!(photos.len(), 1);
    assert_eq!(photos[0].file_id, "front-x");
}

#[test]
fn test_staff_edits_tool() {
    let env = TestEnv::new();
    let tool_id = env.add_tool("Oscilloscope", 2);

    assert_eq!(env.send(STAFF, "/edit").outcome, Outcome::Opened(FlowMode::Edit));
    assert_eq!(env.send(STAFF, &tool_id.to_string()).outcome, Outcome::Advanced(Topic::ManageEditTool));

    let routed = env.send(STAFF, "colour");
    assert_eq!(routed.outcome, Outcome::Reprompted(Topic::ManageEditTool));
    // Nothing changed yet
    let routed = env.press(STAFF, "selesai");
    assert_eq!(routed.outcome, Outcome::Reprompted(Topic::ManageEditTool));

    let routed = env.press(STAFF, "stock");
    assert_eq!(routed.outcome, Outcome::Advanced(Topic::ManageEditStock));
    assert!(all_text(&routed).contains("New value for Stock?"));
    let routed = env.send(STAFF, "many");
    assert_eq!(routed.outcome, Outcome::Reprompted(Topic::ManageEditStock));
    assert!(all_text(&routed).contains("New value for Stock?"));

    assert_eq!(env.send(STAFF, "7").outcome, Outcome::Advanced(Topic::ManageEditField));
    assert_eq!(env.send(STAFF, "nama").outcome, Outcome::Advanced(Topic::ManageEditName));
    assert_eq!(env.send(STAFF, "Oscilloscope DS1054").outcome, Outcome::Advanced(Topic::ManageEditField));

    let routed = env.press(STAFF, "selesai");
    assert_eq!(routed.outcome, Outcome::Advanced(Topic::ManageEditConfirm));
    let summary = all_text(&routed);
    assert!(summary.contains("Name: Oscilloscope DS1054"));
    assert!(summary.contains("Stock: 7"));

    assert_eq!(env.press(STAFF, "ya").outcome, Outcome::Finalized(FlowMode::Edit));
    let tool = tools::get_tool(&env.conn(), tool_id).unwrap().unwrap();
    assert_eq!(tool.name, "Oscilloscope DS1054");
    assert_eq!(tool.stock, 7);
    assert_eq!(tool.brand, "Generic");
}

#[test]
fn test_staff_adds_album_to_tool() {
    let env = TestEnv::new();
    let tool_id = env.add_tool("Oscilloscope", 2);

    env.send(STAFF, "/foto");
    assert_eq!(env.send(STAFF, &tool_id.to_string()).outcome, Outcome::Advanced(Topic::ManagePhotoTool));

    let routed = env.press(STAFF, "selesai");
    assert_eq!(routed.outcome, Outcome::Reprompted(Topic::ManagePhotoTool));
    assert!(all_text(&routed).starts_with("Send at least one photo first."));

    let first = env.send_photo(STAFF, "a", Some("album-1"));
    assert_eq!(first.outcome, Outcome::Advanced(Topic::ManagePhotoUpload));
    assert!(!all_text(&first).is_empty());

    // Later photos of the same album are recorded silently
    let second = env.send_photo(STAFF, "b", Some("album-1"));
    assert_eq!(second.outcome, Outcome::Advanced(Topic::ManagePhotoUpload));
    assert!(all_text(&second).is_empty());

    assert_eq!(env.press(STAFF, "selesai").outcome, Outcome::Advanced(Topic::ManagePhotoConfirm));
    assert_eq!(env.press(STAFF, "ya").outcome, Outcome::Finalized(FlowMode::Photo));

    let photos = tools::get_tool_photos(&env.conn(), tool_id).unwrap();
    let ids: Vec<&str> = photos.iter().map(|p| p.file_id.as_str()).collect();
    assert_eq!(ids, vec!["a-x", "b-x"]);
}
