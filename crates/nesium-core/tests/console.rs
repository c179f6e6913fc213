mod common;

use anyhow::{Context, Result};
use common::{INPUT_ECHO, NMI_COUNTER, input_echo_rom};
use ctor::ctor;
use nesium_core::{
    Nes,
    controller::Buttons,
    ppu::{SCREEN_HEIGHT, SCREEN_WIDTH},
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

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

fn boot() -> Result<Nes> {
    let mut nes = Nes::new();
    nes.load_cartridge_bytes(&input_echo_rom())
        .context("loading input echo rom")?;
    Ok(nes)
}

#[test]
fn nmi_handler_runs_once_per_frame() -> Result<()> {
    let mut nes = boot()?;
    for _ in 0..10 {
        nes.run_frame();
    }
    let count = nes.peek(NMI_COUNTER);
    // Two frames of warm-up before NMIs are enabled.
    assert!((7..=9).contains(&count), "nmi count {count}");
    Ok(())
}

#[test]
fn controller_input_reaches_ram_and_screen() -> Result<()> {
    let mut nes = boot()?;
    for _ in 0..3 {
        nes.run_frame();
    }
    let pressed = Buttons::A | Buttons::RIGHT;
    nes.set_buttons(0, pressed);
    nes.run_frame();
    nes.run_frame();

    assert_eq!(nes.peek(INPUT_ECHO), pressed.bits());
    let frame = nes.render_buffer();
    assert_eq!(frame.len(), SCREEN_WIDTH * SCREEN_HEIGHT);
    assert!(frame.iter().all(|&px| px == pressed.bits() & 0x3F));
    Ok(())
}

#[test]
fn identical_inputs_give_identical_runs() -> Result<()> {
    let mut rng = StdRng::seed_from_u64(0x5eed);
    let inputs: Vec<Buttons> = (0..60)
        .map(|_| Buttons::from_bits_truncate(rng.random()))
        .collect();

    let mut a = boot()?;
    let mut b = boot()?;
    for &buttons in &inputs {
        a.set_buttons(0, buttons);
        b.set_buttons(0, buttons);
        a.run_frame();
        b.run_frame();
    }
    assert_eq!(a.ram(), b.ram());
    assert_eq!(a.render_buffer(), b.render_buffer());
    assert_eq!(a.cpu.cycles(), b.cpu.cycles());
    Ok(())
}

#[test]
fn power_cycle_restores_prg_ram() -> Result<()> {
    let mut nes = boot()?;
    for _ in 0..5 {
        nes.run_frame();
    }
    assert_ne!(nes.peek(NMI_COUNTER), 0);
    nes.power_on_reset();
    assert_eq!(nes.peek(NMI_COUNTER), 0);
    assert_eq!(nes.frame_count(), 0);
    Ok(())
}
