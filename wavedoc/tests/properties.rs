// Copyright 2025 Cornell University
// released under BSD 3-Clause License
// author: Kevin Laeufer <laeufer@cornell.edu>
//
// Generates random VCDs and checks invariants that must hold for every input.

use proptest::prelude::*;
use proptest::sample::Index;
use wavedoc::simple::*;
use wavedoc::*;

#[derive(Debug, Clone, Copy)]
enum Decl {
    Open,
    Close,
    Var(u32),
}

fn decls() -> impl Strategy<Value = Vec<Decl>> {
    prop::collection::vec(
        prop_oneof![
            Just(Decl::Open),
            Just(Decl::Close),
            (1u32..=16).prop_map(Decl::Var),
        ],
        0..30,
    )
}

fn steps() -> impl Strategy<Value = Vec<(u64, Index, u64)>> {
    prop::collection::vec((0u64..4, any::<Index>(), any::<u64>()), 0..40)
}

struct Generated {
    text: String,
    references: Vec<String>,
    last_marker: Time,
}

fn id_code(index: usize) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";
    let mut out = String::new();
    let mut value = index;
    loop {
        out.push(ALPHABET[value % ALPHABET.len()] as char);
        value /= ALPHABET.len();
        if value == 0 {
            break out;
        }
    }
}

fn generate(decls: &[Decl], steps: &[(u64, Index, u64)]) -> Generated {
    let mut text = String::new();
    let mut references = Vec::new();
    let mut scopes: Vec<String> = Vec::new();
    let mut vars: Vec<(String, u32)> = Vec::new();
    let mut scope_count = 0;
    for decl in decls {
        match decl {
            Decl::Open => {
                let name = format!("s{scope_count}");
                scope_count += 1;
                text.push_str(&format!("$scope module {name} $end\n"));
                scopes.push(name);
            }
            Decl::Close => {
                if scopes.pop().is_some() {
                    text.push_str("$upscope $end\n");
                }
            }
            Decl::Var(width) => {
                let id = id_code(vars.len());
                let name = format!("v{}", vars.len());
                text.push_str(&format!("$var wire {width} {id} {name} $end\n"));
                let mut reference = scopes.clone();
                reference.push(name);
                references.push(reference.join("."));
                vars.push((id, *width));
            }
        }
    }
    for _ in scopes.drain(..) {
        text.push_str("$upscope $end\n");
    }
    text.push_str("$enddefinitions $end\n#0\n");

    let mut time = 0;
    for (delta, var, seed) in steps {
        if *delta > 0 {
            time += delta;
            text.push_str(&format!("#{time}\n"));
        }
        if vars.is_empty() {
            continue;
        }
        let (id, width) = &vars[var.index(vars.len())];
        if *width == 1 {
            text.push_str(&format!("{}{id}\n", seed & 1));
        } else {
            let bits = format!("{:064b}", seed);
            text.push_str(&format!("b{} {id}\n", &bits[64 - *width as usize..]));
        }
    }
    Generated {
        text,
        references,
        last_marker: time,
    }
}

proptest! {
    #[test]
    fn references_follow_the_scopes(decls in decls()) {
        let generated = generate(&decls, &[]);
        let data = read_vcd(&VcdSource::content(generated.text), &ParseOptions::default()).unwrap();
        prop_assert_eq!(data.signal_names(), generated.references.as_slice());
        for (record, reference) in data.iter().zip(generated.references.iter()) {
            prop_assert_eq!(record.first_reference(), Some(reference.as_str()));
        }
    }

    #[test]
    fn waves_are_ordered_and_now_is_last_marker(decls in decls(), steps in steps()) {
        let generated = generate(&decls, &steps);
        let doc = parse_vcd(&VcdSource::content(generated.text)).unwrap();
        prop_assert_eq!(doc.now, generated.last_marker);
        prop_assert_eq!(doc.leaves().count(), generated.references.len());
        for leaf in doc.leaves() {
            prop_assert!(leaf.wave().windows(2).all(|w| w[0].time <= w[1].time));
            prop_assert!(leaf.wave().iter().all(|e| e.time <= doc.now));
        }
    }

    #[test]
    fn json_round_trip(decls in decls(), steps in steps()) {
        let generated = generate(&decls, &steps);
        let doc = parse_vcd(&VcdSource::content(generated.text)).unwrap();
        let json = doc.to_json().unwrap();
        prop_assert_eq!(Document::from_json(&json).unwrap(), doc);
    }

    #[test]
    fn fallback_matches_primary(decls in decls(), steps in steps()) {
        let generated = generate(&decls, &steps);
        let source = VcdSource::content(generated.text);
        let primary = parse_primary(&source, &ParseOptions::default()).unwrap();
        let fallback = parse_fallback(&source).unwrap();
        prop_assert_eq!(primary.now, fallback.now);
        let ours: Vec<_> = primary.leaves().map(|l| (l.full_name(), l.wave().to_vec())).collect();
        let theirs: Vec<_> = fallback.leaves().map(|l| (l.full_name(), l.wave().to_vec())).collect();
        prop_assert_eq!(ours, theirs);
    }
}

#[test]
fn test_id_code() {
    assert_eq!(id_code(0), "A");
    assert_eq!(id_code(51), "z");
    assert_eq!(id_code(52), "AB");
}
