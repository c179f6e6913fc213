mod common;

use anyhow::Result;
use common::{GAME_STATE, INPUT_SUM, LIVES, PLAYER_X, TICKS, mini_game_rom, session, session_with, smb_session};
use nesium_env::{
    Action, EngineContext, Error, InvalidActionPolicy, Phase, Session, SessionConfig,
};

#[test]
fn fresh_session_reports_fixed_geometry() -> Result<()> {
    let session = session();
    assert_eq!(session.screen_dims(), (256, 240));
    assert_eq!(session.ram_size(), 2048);
    assert_eq!(session.frame_number(), 0);
    assert_eq!(session.episode_frame_number(), 0);
    assert_eq!(session.phase(), Phase::Loaded);
    assert!(!session.is_terminal());
    Ok(())
}

#[test]
fn each_act_is_one_frame() -> Result<()> {
    let mut session = session();
    for i in 1..=5 {
        session.act(0)?;
        assert_eq!(session.frame_number(), i);
        assert_eq!(session.episode_frame_number(), i);
    }
    assert_eq!(session.phase(), Phase::Playing);
    Ok(())
}

#[test]
fn actions_reach_the_cartridge() -> Result<()> {
    let mut session = session();
    for _ in 0..4 {
        session.act(Action::Noop)?;
    }
    let before = session.ram();
    session.act(Action::ARight)?;
    let after = session.ram();

    assert_eq!(after[TICKS], before[TICKS].wrapping_add(1));
    assert_eq!(after[INPUT_SUM], before[INPUT_SUM].wrapping_add(0x81));
    assert_eq!(after[PLAYER_X], before[PLAYER_X] + 1);
    Ok(())
}

#[test]
fn reset_starts_a_new_episode() -> Result<()> {
    let mut session = session_with(SessionConfig::default().with_max_frames(3));
    for _ in 0..3 {
        session.act(Action::Right)?;
    }
    assert!(session.is_terminal());
    assert_eq!(session.phase(), Phase::GameOver);

    session.reset();
    assert!(!session.is_terminal());
    assert_eq!(session.episode_frame_number(), 0);
    assert_eq!(session.frame_number(), 3);
    assert_eq!(session.phase(), Phase::Playing);
    assert_eq!(session.ram()[PLAYER_X], 0);
    assert_eq!(session.screen_dims(), (256, 240));
    Ok(())
}

#[test]
fn episode_limit_can_change_mid_session() -> Result<()> {
    let mut session = session();
    session.set_max_num_frames(2);
    session.act(Action::Noop)?;
    assert!(!session.is_terminal());
    session.act(Action::Noop)?;
    assert!(session.is_terminal());
    Ok(())
}

#[test]
fn illegal_actions_are_rejected_by_default() -> Result<()> {
    let mut session = session();
    session.act(0)?;
    let ram = session.ram();

    for code in [-1, 15, 18, 99] {
        match session.act(code) {
            Err(Error::InvalidAction { code: got }) => assert_eq!(got, code),
            other => panic!("code {code}: unexpected {other:?}"),
        }
    }
    assert_eq!(session.frame_number(), 1);
    assert_eq!(session.ram(), ram);
    Ok(())
}

#[test]
fn illegal_actions_can_fall_back_to_noop() -> Result<()> {
    let mut session =
        session_with(SessionConfig::default().with_invalid_action(InvalidActionPolicy::Noop));
    let reward = session.act(42)?;
    assert_eq!(reward, 0);
    assert_eq!(session.frame_number(), 1);
    Ok(())
}

#[test]
fn action_sets_are_the_fifteen_pad_combinations() {
    let session = session();
    assert_eq!(session.legal_action_set(), session.minimal_action_set());
    assert_eq!(session.num_legal_actions(), 15);
    assert_eq!(session.legal_action_set()[8], Action::ARight);
}

#[test]
fn smb_profile_rewards_progress_and_detects_game_over() -> Result<()> {
    let mut session = smb_session();
    session.reset();
    assert_eq!(session.frame_number(), 70);
    assert_eq!(session.lives(), 3);
    assert_eq!(session.ram()[GAME_STATE], 1);

    assert_eq!(session.act(Action::Right)?, 5);
    assert_eq!(session.act(Action::A)?, 10);
    assert_eq!(session.act(Action::ARight)?, 15);
    assert_eq!(session.current_score(), 20);
    assert_eq!(session.episode_score(), 30);
    assert!(!session.is_terminal());

    session.act(Action::Down)?;
    assert!(session.is_terminal());
    assert_eq!(session.current_score(), 0);
    assert_eq!(session.ram()[LIVES], 3);
    Ok(())
}

#[test]
fn reward_range_depends_on_profile() {
    let generic = session();
    assert_eq!((generic.min_reward(), generic.max_reward()), (0, 0));
    let smb = smb_session();
    assert_eq!(smb.min_reward(), -100);
    assert_eq!(smb.max_reward(), 9_999_990 + 100);
}

#[test]
fn sticky_actions_with_certainty_repeat_the_first_action() -> Result<()> {
    let mut session = session_with(SessionConfig::default().with_sticky_actions(1.0));
    for _ in 0..4 {
        session.act(Action::Right)?;
    }
    // The initial previous action is NOOP, so RIGHT never gets through.
    assert_eq!(session.ram()[PLAYER_X], 0);
    Ok(())
}

#[test]
fn load_errors_are_reported() {
    let context: EngineContext = EngineContext::default();
    let err = context
        .create_session_from_bytes(b"not a rom", SessionConfig::default())
        .expect_err("garbage must not load");
    assert!(matches!(err, Error::Load(_)));

    let mut rom = mini_game_rom();
    rom[6] = 0x40; // mapper 4
    assert!(matches!(
        Session::from_rom_bytes(&rom),
        Err(Error::Load(_))
    ));

    assert!(matches!(
        Session::create("/no/such/rom.nes"),
        Err(Error::Load(_))
    ));
}

#[test]
fn invalid_config_is_rejected_before_loading() {
    let config = SessionConfig::default().with_sticky_actions(2.0);
    let context: EngineContext = EngineContext::default();
    assert!(matches!(
        context.create_session_from_bytes(&mini_game_rom(), config),
        Err(Error::InvalidConfig(_))
    ));
}

#[test]
fn sessions_are_independent() -> Result<()> {
    let mut a = session();
    let mut b = session();
    for _ in 0..6 {
        a.act(Action::Right)?;
        b.act(Action::Noop)?;
    }
    assert_ne!(a.ram()[PLAYER_X], b.ram()[PLAYER_X]);
    assert_eq!(b.ram()[PLAYER_X], 0);

    let handle = std::thread::spawn(move || -> Result<u64> {
        a.act(Action::Noop)?;
        Ok(a.frame_number())
    });
    let frames = handle.join().expect("worker thread")?;
    assert_eq!(frames, 7);
    Ok(())
}
