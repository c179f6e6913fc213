mod common;

use anyhow::Result;
use common::{INPUT_SUM, session};
use nesium_env::{Action, Error, Session};
use proptest::prelude::*;

fn warmed_up() -> Result<Session> {
    let mut session = session();
    for _ in 0..4 {
        session.act(Action::Noop)?;
    }
    session.act(Action::BRight)?;
    session.act(Action::Noop)?;
    Ok(session)
}

#[test]
fn screen_and_ram_have_declared_sizes() -> Result<()> {
    let session = warmed_up()?;
    let (width, height) = session.screen_dims();
    assert_eq!(session.screen().len(), width * height);
    assert_eq!(session.ram().len(), session.ram_size());
    assert_eq!(session.screen_rgb()?.len(), width * height * 3);
    assert_eq!(session.screen_grayscale()?.len(), width * height);
    Ok(())
}

#[test]
fn backdrop_tracks_the_input_sum() -> Result<()> {
    let session = warmed_up()?;
    let backdrop = session.ram()[INPUT_SUM] & 0x3F;
    assert_eq!(backdrop, 0x82 & 0x3F);
    assert!(session.screen().iter().all(|&px| px == backdrop));
    Ok(())
}

#[test]
fn fill_variants_match_allocating_variants() -> Result<()> {
    let session = warmed_up()?;
    let mut screen = vec![0u8; session.screen_size()];
    session.fill_screen(&mut screen)?;
    assert_eq!(screen, session.screen());

    let mut ram = vec![0u8; session.ram_size()];
    session.fill_ram(&mut ram)?;
    assert_eq!(ram, session.ram());

    let mut rgb = vec![0u8; screen.len() * 3];
    session.fill_rgb(&screen, &mut rgb)?;
    assert_eq!(rgb, session.to_rgb(&screen)?);
    assert_eq!(rgb, session.screen_rgb()?);

    let mut gray = vec![0u8; screen.len()];
    session.fill_screen_grayscale(&mut gray)?;
    assert_eq!(gray, session.to_grayscale(&screen)?);
    Ok(())
}

#[test]
fn extraction_does_not_touch_the_simulation() -> Result<()> {
    let mut a = warmed_up()?;
    let mut b = warmed_up()?;
    for _ in 0..3 {
        let _ = a.screen();
        let _ = a.ram();
        let _ = a.screen_rgb()?;
    }
    a.act(Action::Left)?;
    b.act(Action::Left)?;
    assert_eq!(a.ram(), b.ram());
    assert_eq!(a.frame_number(), b.frame_number());
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn wrong_lengths_fail_without_writing(len in 0usize..200_000, fill in any::<u8>()) {
        let session = session();
        let pixels = session.screen_size();

        let mut buf = vec![fill; len];
        let screen = session.fill_screen(&mut buf);
        if len == pixels {
            prop_assert!(screen.is_ok());
        } else {
            let is_size_mismatch = matches!(screen, Err(Error::SizeMismatch { .. }));
            prop_assert!(is_size_mismatch);
            prop_assert!(buf.iter().all(|&b| b == fill));
        }

        let mut buf = vec![fill; len];
        let ram = session.fill_ram(&mut buf);
        prop_assert_eq!(ram.is_ok(), len == session.ram_size());
        if len != session.ram_size() {
            prop_assert!(buf.iter().all(|&b| b == fill));
        }

        let indexed = vec![fill & 0x3F; len];
        prop_assert_eq!(session.to_rgb(&indexed).is_ok(), len == pixels);
        prop_assert_eq!(session.to_grayscale(&indexed).is_ok(), len == pixels);

        let mut out = vec![fill; len * 3];
        let converted = session.fill_rgb(&indexed, &mut out);
        prop_assert_eq!(converted.is_ok(), len == pixels);
        if len != pixels {
            prop_assert!(out.iter().all(|&b| b == fill));
        }

        let mut out = vec![fill; len];
        let converted = session.fill_grayscale(&indexed, &mut out);
        prop_assert_eq!(converted.is_ok(), len == pixels);
        if len != pixels {
            prop_assert!(out.iter().all(|&b| b == fill));
        }
    }

    #[test]
    fn screen_conversions_check_the_output_buffer(len in 0usize..200_000, fill in any::<u8>()) {
        let session = session();
        let pixels = session.screen_size();

        let mut rgb = vec![fill; len];
        let converted = session.fill_screen_rgb(&mut rgb);
        prop_assert_eq!(converted.is_ok(), len == pixels * 3);
        if len != pixels * 3 {
            prop_assert!(rgb.iter().all(|&b| b == fill));
        }

        let mut gray = vec![fill; len];
        let converted = session.fill_screen_grayscale(&mut gray);
        prop_assert_eq!(converted.is_ok(), len == pixels);
        if len != pixels {
            prop_assert!(gray.iter().all(|&b| b == fill));
        }
    }

    #[test]
    fn grayscale_output_with_a_sized_input_checks_its_length(extra in 1usize..1024, fill in any::<u8>()) {
        let session = session();
        let indexed = session.screen();
        for len in [indexed.len() - extra, indexed.len() + extra] {
            let mut out = vec![fill; len];
            let is_size_mismatch = matches!(
                session.fill_grayscale(&indexed, &mut out),
                Err(Error::SizeMismatch { .. })
            );
            prop_assert!(is_size_mismatch);
            prop_assert!(out.iter().all(|&b| b == fill));
        }
    }

    #[test]
    fn rgb_output_is_palette_lookup(index in 0u8..64) {
        let session = session();
        let pixels = session.screen_size();
        let indexed = vec![index; pixels];
        let rgb = session.to_rgb(&indexed).expect("sized input");
        let gray = session.to_grayscale(&indexed).expect("sized input");
        prop_assert!(rgb.chunks_exact(3).all(|px| px == &rgb[..3]));
        prop_assert!(gray.iter().all(|&g| g == gray[0]));
    }
}
