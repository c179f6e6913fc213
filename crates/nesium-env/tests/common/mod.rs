#![allow(dead_code)]

//! Test cartridges assembled in memory.

use ctor::ctor;
use nesium_env::{EngineContext, GameProfile, Session, SessionConfig};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

const PRG_BANK: usize = 16 * 1024;

/// Controller byte read during the last NMI.
pub const PAD: usize = 0x00;
/// NMI counter.
pub const TICKS: usize = 0x01;
/// Running sum of controller bytes; its low six bits paint the backdrop.
pub const INPUT_SUM: usize = 0x02;
pub const PLAYER_X: usize = 0x86;
pub const LIVES: usize = 0x075A;
pub const GAME_STATE: usize = 0x0770;
pub const SCORE_TENS: usize = 0x07E2;

#[ctor]
fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_file(true)
        .with_line_number(true)
        .with_max_level(Level::DEBUG)
        .pretty()
        .finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
}

/// A tiny NROM game. Every NMI it reads pad 1 and then:
/// - accumulates the byte into [`INPUT_SUM`] and paints the backdrop with it,
/// - moves the player right on RIGHT, scores ten points on A,
/// - ends the game (game state 0) on DOWN.
///
/// The RAM layout mirrors the addresses the Super Mario Bros. profile reads.
pub fn mini_game_rom() -> Vec<u8> {
    #[rustfmt::skip]
    let reset: &[u8] = &[
        0x78, 0xD8, 0xA2, 0xFF, 0x9A,       // SEI; CLD; LDX #$FF; TXS
        0x2C, 0x02, 0x20, 0x10, 0xFB,       // BIT $2002; BPL -5
        0x2C, 0x02, 0x20, 0x10, 0xFB,       // BIT $2002; BPL -5
        0xA9, 0x01, 0x8D, 0x70, 0x07,       // LDA #1; STA $0770
        0xA9, 0x03, 0x8D, 0x5A, 0x07,       // LDA #3; STA $075A
        0xA9, 0x80, 0x8D, 0x00, 0x20,       // LDA #$80; STA $2000
        0x4C, 0x1E, 0x80,                   // JMP $801E
    ];
    #[rustfmt::skip]
    let nmi: &[u8] = &[
        0xA9, 0x01, 0x8D, 0x16, 0x40,       // LDA #1; STA $4016
        0xA9, 0x00, 0x8D, 0x16, 0x40,       // LDA #0; STA $4016
        0xA2, 0x08,                         // LDX #8
        0xAD, 0x16, 0x40, 0x4A,             // LDA $4016; LSR A
        0x66, 0x00, 0xCA, 0xD0, 0xF7,       // ROR $00; DEX; BNE -9
        0xE6, 0x01,                         // INC $01
        0x18, 0xA5, 0x02, 0x65, 0x00,       // CLC; LDA $02; ADC $00
        0x85, 0x02,                         // STA $02
        0xA9, 0x3F, 0x8D, 0x06, 0x20,       // LDA #$3F; STA $2006
        0xA9, 0x00, 0x8D, 0x06, 0x20,       // LDA #0; STA $2006
        0xA5, 0x02, 0x29, 0x3F,             // LDA $02; AND #$3F
        0x8D, 0x07, 0x20,                   // STA $2007
        0xA5, 0x00, 0x29, 0x80, 0xF0, 0x02, // LDA $00; AND #$80; BEQ +2
        0xE6, 0x86,                         // INC $86
        0xA5, 0x00, 0x29, 0x01, 0xF0, 0x03, // LDA $00; AND #$01; BEQ +3
        0xEE, 0xE2, 0x07,                   // INC $07E2
        0xA5, 0x00, 0x29, 0x20, 0xF0, 0x05, // LDA $00; AND #$20; BEQ +5
        0xA9, 0x00, 0x8D, 0x70, 0x07,       // LDA #0; STA $0770
        0x40,                               // RTI
    ];

    let mut prg = vec![0xEA; PRG_BANK];
    prg[..reset.len()].copy_from_slice(reset);
    prg[0x100..0x100 + nmi.len()].copy_from_slice(nmi);
    // NMI $8100, RESET $8000, IRQ $8100
    prg[PRG_BANK - 6..].copy_from_slice(&[0x00, 0x81, 0x00, 0x80, 0x00, 0x81]);

    let mut rom = vec![b'N', b'E', b'S', 0x1A, 1, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0];
    rom.extend_from_slice(&prg);
    rom
}

pub fn session() -> Session {
    Session::from_rom_bytes(&mini_game_rom()).expect("mini game loads")
}

pub fn session_with(config: SessionConfig) -> Session {
    let context: EngineContext = EngineContext::default();
    context
        .create_session_from_bytes(&mini_game_rom(), config)
        .expect("mini game loads")
}

pub fn smb_session() -> Session {
    session_with(SessionConfig::default().with_profile(GameProfile::SuperMarioBros))
}
