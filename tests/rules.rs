use rand::{Rng, SeedableRng};
use stagger_life::{LifeError, RuleTable};

fn parse(text: &str) -> RuleTable {
    RuleTable::parse(text).unwrap_or_else(|err| panic!("{text}: {err}"))
}

fn reason(text: &str) -> &'static str {
    match RuleTable::parse(text) {
        Err(LifeError::InvalidRuleSyntax { rule, reason }) => {
            assert_eq!(rule, text);
            reason
        }
        other => panic!("{text} parsed to {other:?}"),
    }
}

/// Shape letters valid for `count` neighbours.
fn letters(count: u32) -> &'static str {
    match count.min(8 - count) {
        1 => "ce",
        2 => "ceaikv",
        3 => "ceaikvjqry",
        4 => "ceaikvjqrytwz",
        _ => "",
    }
}

fn random_half(rng: &mut impl Rng, survival: bool) -> String {
    let mut out = String::new();
    let first = if survival { 0 } else { 1 };
    for count in first..=8 {
        if !rng.random_bool(0.4) {
            continue;
        }
        out.push(char::from(b'0' + count as u8));
        let letters = letters(count);
        if letters.is_empty() || rng.random_bool(0.5) {
            continue;
        }
        if rng.random_bool(0.3) {
            out.push('-');
        }
        for letter in letters.chars() {
            if rng.random_bool(0.3) {
                out.push(letter);
            }
        }
    }
    out
}

#[test]
fn survival_first_and_golly_forms_agree() {
    let conway = RuleTable::conway();
    assert_eq!(parse("23/3"), conway);
    assert_eq!(parse("B3/S23"), conway);
    assert_eq!(parse("S23/B3"), conway);
    assert_eq!(parse("B3/S23 (Conway's Life)"), conway);
    assert_eq!(parse("b3/s23"), conway);
    assert_eq!(conway.canonical(), "B3/S23");
    assert_eq!(parse("23/36").canonical(), "B36/S23");
}

#[test]
fn lookup_follows_neighbour_counts() {
    let rule = parse("B3/S23");
    // Centre alone dies, three neighbours in a row give birth.
    assert!(!rule.lookup(0o020));
    assert!(rule.lookup(0o700));
    assert!(rule.lookup(0o720));
    assert!(rule.lookup(0o120 | 0o001));
    assert!(!rule.lookup(0o777));
}

#[test]
fn negated_letters_match_explicit_list() {
    let negated = parse("B2-a/S");
    assert_eq!(negated, parse("B2ceikv/S"));
    assert_eq!(negated.canonical(), "B2-a/S");
    assert_eq!(parse("B3/S2-i34q"), parse("B3/S2acekv34q"));
}

#[test]
fn letters_are_rotation_invariant() {
    let rule = parse("B2a/S");
    // Adjacent corner and edge, every rotation and reflection.
    for pattern in [0o600, 0o300, 0o110, 0o011, 0o003, 0o006, 0o044, 0o440] {
        assert!(rule.lookup(pattern), "{pattern:o}");
    }
    assert!(!rule.lookup(0o500));
}

#[test]
fn canonical_form_round_trips() {
    for text in ["B3/S23", "B36/S23", "B3678/S34678", "B2ce3/S23", "B1/S8"] {
        let rule = parse(text);
        assert_eq!(parse(&rule.canonical()), rule, "{text}");
    }

    let mut rng = rand::rngs::StdRng::seed_from_u64(0xB5);
    for _ in 0..200 {
        let text = format!(
            "B{}/S{}",
            random_half(&mut rng, false),
            random_half(&mut rng, true)
        );
        let rule = parse(&text);
        let canonical = rule.canonical();
        assert_eq!(parse(&canonical), rule, "{text} -> {canonical}");
        assert_eq!(parse(&canonical).canonical(), canonical);
    }
}

#[test]
fn malformed_rules_are_rejected() {
    assert!(reason("B3S23").contains('/'));
    assert!(reason("B03/S23").contains("B0"));
    assert!(reason("B39/S23").contains("0 to 8"));
    assert!(reason("B3x/S23").contains("letter"));
    // Letters are only meaningful for counts 1 to 7.
    assert!(reason("B3/S8a").contains("letter"));
    assert!(reason("B3/S0c").contains("letter"));
    assert!(reason("B3/S2z").contains("letter"));
    assert!("23/3".parse::<RuleTable>().is_ok());
}
