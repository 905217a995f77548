use pretty_assertions::assert_eq;
use slr_core::grammar::load_grammar;
use slr_core::parser::ParseStatus;
use slr_core::Parser;

const TOY_GRAMMAR: &str = "E T
i + * ( )
E:E+T|T
T:T*i|i
E
";

const TOY_TABLE: &str = "d3 x x x x x 1 2
x d4 x x x acc x x
x r2 d5 x x r2 x x
x r4 r4 x x r4 x x
d3 x x x x x x 6
d7 x x x x x x x
x r1 d5 x x r1 x x
x r3 r3 x x r3 x x
";

const EPSILON_GRAMMAR: &str = "S
a b
S:aSb|
S
";

const EPSILON_TABLE: &str = "d2 r2 r2 1
x x acc x
d2 r2 r2 3
x d4 x x
x r1 r1 x
";

#[test]
fn should_build_expected_toy_table() {
    let parser = TOY_GRAMMAR.parse::<Parser>().unwrap();

    assert_eq!(8, parser.table().states());
    assert_eq!(TOY_TABLE, parser.serialize_table());
}

#[test]
fn should_recognize_toy_grammar_inputs() {
    let parser = TOY_GRAMMAR.parse::<Parser>().unwrap();

    assert_eq!(ParseStatus::Accepted, parser.parse("i+i*i"));
    assert_eq!(ParseStatus::Rejected, parser.parse("i+"));
    assert_eq!(ParseStatus::Rejected, parser.parse("(i)"));
    assert_eq!(ParseStatus::Rejected, parser.parse(""));
    assert_eq!(ParseStatus::Rejected, parser.parse(None));
}

#[test]
fn should_build_expected_epsilon_table() {
    let parser = EPSILON_GRAMMAR.parse::<Parser>().unwrap();

    assert_eq!(EPSILON_TABLE, parser.serialize_table());
    assert_eq!(ParseStatus::Accepted, parser.parse(""));
    assert_eq!(ParseStatus::Accepted, parser.parse("ab"));
    assert_eq!(ParseStatus::Rejected, parser.parse("aab"));
}

#[test]
fn should_recognize_with_hand_written_table() {
    let grammar_table = load_grammar(TOY_GRAMMAR).unwrap();
    let parser = Parser::with_table(grammar_table, TOY_TABLE).unwrap();

    for (input, expected) in [
        ("i", ParseStatus::Accepted),
        ("i*i+i*i", ParseStatus::Accepted),
        ("i*", ParseStatus::Rejected),
        ("+i", ParseStatus::Rejected),
    ] {
        assert_eq!(expected, parser.parse(input), "{:?}", input);
    }
}

#[test]
fn should_number_states_identically_across_builds() {
    let first = TOY_GRAMMAR.parse::<Parser>().unwrap();
    let second = TOY_GRAMMAR.parse::<Parser>().unwrap();

    assert_eq!(first.table(), second.table());
}
