//! Integration-Tests fuer Multiplexer, Demultiplexer und Link-Lauf

use std::collections::BTreeMap;

use tdmlink_core::{CompandingLaw, LinkConfig, LinkEreignis, UserAssignment, UserId};
use tdmlink_voice::{
    link_ausfuehren, Demultiplexer, Multiplexer, Packet, Stoerung, SyncBitFlip, VoiceResult,
};

fn config(nutzer: usize) -> LinkConfig {
    LinkConfig {
        anzahl_nutzer: nutzer,
        ..LinkConfig::default()
    }
}

fn sinus(n: usize, phase: f64) -> Vec<f64> {
    (0..n)
        .map(|k| 0.7 * (std::f64::consts::TAU * 400.0 * k as f64 / 8000.0 + phase).sin())
        .collect()
}

fn streams(laengen: &[usize]) -> BTreeMap<UserId, Vec<f64>> {
    laengen
        .iter()
        .enumerate()
        .map(|(i, &n)| (UserId(i as u32), sinus(n, i as f64)))
        .collect()
}

fn alle_pakete(config: &LinkConfig, laengen: &[usize]) -> Vec<Packet> {
    Multiplexer::neu(config, streams(laengen))
        .expect("Multiplexer konnte nicht erstellt werden")
        .collect::<VoiceResult<_>>()
        .expect("Runde fehlgeschlagen")
}

#[test]
fn drei_gleich_lange_streams() {
    let pakete = alle_pakete(&config(3), &[5, 5, 5]);
    assert_eq!(pakete.len(), 5);
    for p in &pakete {
        assert_eq!(p.len(), 3);
        assert_eq!(p.user_ids(), vec![UserId(0), UserId(1), UserId(2)]);
    }
}

#[test]
fn ungleich_lange_streams() {
    let pakete = alle_pakete(&config(3), &[5, 3, 5]);
    assert_eq!(pakete.len(), 5);
    assert!(pakete[3].len() <= 2);
    assert!(pakete[4].len() <= 2);
    for p in &pakete {
        let ids = p.user_ids();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
    }
}

#[test]
fn ein_korruptes_sync_bit() {
    let cfg = config(4);
    let mut pakete = alle_pakete(&cfg, &[30, 30, 30, 30]);
    pakete[17].frame_mut(2).unwrap().sync_bit_kippen();

    let mut demux = Demultiplexer::neu(&cfg).unwrap();
    for p in &pakete {
        demux.process_packet(p).unwrap();
    }
    let out = demux.finish();

    assert_eq!(out.framing_fehler_anzahl(), 1);
    assert_eq!(out.framing_fehler[0].user_id, UserId(2));
    assert_eq!(out.framing_fehler[0].slot_index, 17 % 10);
    for (id, nutzer) in &out.nutzer {
        let erwartet = if *id == UserId(2) { 29 } else { 30 };
        assert_eq!(nutzer.samples.len(), erwartet, "{id}");
    }
}

#[test]
fn positional_und_tagged_gleich_bei_gleichen_laengen() {
    let tagged = config(3);
    let positional = LinkConfig {
        zuordnung: UserAssignment::Positional,
        ..tagged.clone()
    };
    let pakete = alle_pakete(&tagged, &[12, 12, 12]);

    let mut a = Demultiplexer::neu(&tagged).unwrap();
    let mut b = Demultiplexer::neu(&positional).unwrap();
    for p in &pakete {
        a.process_packet(p).unwrap();
        b.process_packet(p).unwrap();
    }
    assert_eq!(a.finish().nutzer, b.finish().nutzer);
}

#[tokio::test]
async fn link_lauf_a_law_mit_stoerungen() {
    let cfg = LinkConfig {
        kennlinie: CompandingLaw::ALaw,
        koeffizient: 87.6,
        ..config(6)
    };
    let stoerung = Stoerung {
        sync_bit_kippen: vec![
            SyncBitFlip {
                paket_index: 0,
                position: 5,
            },
            SyncBitFlip {
                paket_index: 40,
                position: 1,
            },
        ],
    };

    let bericht = link_ausfuehren(cfg, streams(&[80, 80, 60, 80, 80, 80]), stoerung)
        .await
        .unwrap();

    assert_eq!(bericht.pakete, 80);
    assert_eq!(bericht.framing_fehler_gesamt, 2);
    assert_eq!(bericht.nutzer.len(), 6);
    assert_eq!(bericht.nutzer(UserId(5)).unwrap().rekonstruiert, 79);
    assert_eq!(bericht.nutzer(UserId(1)).unwrap().rekonstruiert, 79);
    assert_eq!(bericht.nutzer(UserId(2)).unwrap().rekonstruiert, 60);
    assert!(bericht
        .ereignisse
        .iter()
        .any(|e| matches!(e, LinkEreignis::NutzerBeendet { user_id: UserId(2), runde: 60 })));

    for n in &bericht.nutzer {
        assert!(n.mse_gesamt < 1e-3, "{}: {}", n.user_id, n.mse_gesamt);
    }
}

#[tokio::test]
async fn positional_lauf_mit_konflikt() {
    let cfg = LinkConfig {
        zuordnung: UserAssignment::Positional,
        ..config(3)
    };
    let bericht = link_ausfuehren(cfg, streams(&[10, 4, 10]), Stoerung::default())
        .await
        .unwrap();

    assert_eq!(bericht.pakete, 10);
    assert_eq!(bericht.verworfene_pakete, 6);
    for n in &bericht.nutzer {
        assert_eq!(n.rekonstruiert, 4);
        assert!(n.abgebrochen.is_some());
    }
}
