use lql::{
    evaluate, export_tokens, export_tokens_signed, parse, Arg, ByteCodeReader, Environment, Error,
    ErrorKind, Library, Map, Parser, Position, Value,
};
use pretty_assertions::assert_eq;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

fn obj(pairs: &[(&str, Value)]) -> Map {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect()
}

fn eval(source: &str, ctx: &Map) -> Result<Value, Error> {
    let expr = parse(source)?;
    evaluate(&expr, ctx, &Environment::new())
}

fn eval_ok(source: &str, ctx: &Map) -> Value {
    eval(source, ctx).expect("evaluation failed")
}

fn eval_err(source: &str, ctx: &Map) -> Error {
    eval(source, ctx).expect_err("expected an error")
}

#[test]
fn sensor_reading_plus_one() {
    let ctx = obj(&[(
        "sensor",
        Value::Object(obj(&[("reading", Value::Int(100))])),
    )]);
    assert_eq!(eval_ok("$sensor.reading + 1", &ctx), Value::Int(101));
}

#[test]
fn adult_us_user_predicate() {
    let ctx = obj(&[(
        "user",
        Value::Object(obj(&[
            ("age", Value::Int(20)),
            ("country", Value::Str("US".into())),
        ])),
    )]);
    assert_eq!(
        eval_ok("$user.age >= 18 && $user.country == \"US\"", &ctx),
        Value::Bool(true)
    );
}

#[test]
fn missing_context_field_is_a_reference_error() {
    let err = eval_err("$user.isActive", &Map::new());
    assert_eq!(err.kind(), ErrorKind::Reference);
    assert!(err.message().contains("field 'user' not found"));
    assert_eq!(err.position(), Position::new(1, 1));
    assert_eq!(
        err.to_string(),
        "ReferenceError: field 'user' not found at line 1, column 1"
    );
}

#[test]
fn optional_chain_coalesces_to_default() {
    let ctx = obj(&[(
        "order",
        Value::Object(obj(&[(
            "items",
            Value::Array(vec![Value::Object(obj(&[("price", Value::Int(50))]))]),
        )])),
    )]);
    assert_eq!(
        eval_ok("cond.coalesce($order?.items?[1]?.price, 0)", &ctx),
        Value::Int(0)
    );
}

#[test]
fn sum_of_literal_array_is_float() {
    assert_eq!(
        eval_ok("math.sum([1, 2, (3+4)])", &Map::new()),
        Value::Float(10.0)
    );
}

#[test]
fn ticket_code_matches_pattern() {
    let ctx = obj(&[(
        "ticket",
        Value::Object(obj(&[("code", Value::Str("ABC-123".into()))])),
    )]);
    assert_eq!(
        eval_ok("regex.match(\"^[A-Z]{3}-\\\\d+$\", $ticket.code)", &ctx),
        Value::Bool(true)
    );
}

struct ProbeLib {
    calls: Arc<AtomicUsize>,
}

impl Library for ProbeLib {
    fn call(
        &self,
        _function: &str,
        _args: &[Arg],
        _call_pos: Position,
        _paren_pos: Position,
    ) -> Result<Value, Error> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Value::Bool(true))
    }
}

fn probed_env() -> (Environment, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let mut env = Environment::new();
    env.register(
        "probe",
        ProbeLib {
            calls: calls.clone(),
        },
    );
    (env, calls)
}

#[test]
fn and_short_circuits_on_false_left() {
    let (env, calls) = probed_env();
    let expr = parse("false && probe.touch()").unwrap();
    assert_eq!(evaluate(&expr, &Map::new(), &env).unwrap(), Value::Bool(false));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn or_short_circuits_on_true_left() {
    let (env, calls) = probed_env();
    let expr = parse("true || probe.touch()").unwrap();
    assert_eq!(evaluate(&expr, &Map::new(), &env).unwrap(), Value::Bool(true));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn undecided_logical_operands_do_evaluate() {
    let (env, calls) = probed_env();
    let expr = parse("true AND probe.touch()").unwrap();
    assert_eq!(evaluate(&expr, &Map::new(), &env).unwrap(), Value::Bool(true));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn word_form_logical_operators_evaluate() {
    assert_eq!(eval_ok("true and false", &Map::new()), Value::Bool(false));
    assert_eq!(eval_ok("false or true", &Map::new()), Value::Bool(true));
}

#[test]
fn logical_operators_require_booleans() {
    let err = eval_err("1 && true", &Map::new());
    assert_eq!(err.kind(), ErrorKind::Semantic);
    assert_eq!(err.message(), "AND operator requires boolean operand");
    let err = eval_err("false || 0", &Map::new());
    assert_eq!(err.message(), "OR operator requires boolean operand");
}

#[test]
fn null_propagation_versus_strict_chains() {
    let ctx = obj(&[("a", Value::Object(obj(&[("b", Value::Null)])))]);
    assert_eq!(eval_ok("$a?.b?.c?[0]", &ctx), Value::Null);
    assert_eq!(eval_ok("$a.b?.missing", &ctx), Value::Null);

    let err = eval_err("$a.b.c", &ctx);
    assert_eq!(err.kind(), ErrorKind::Type);
    assert_eq!(err.message(), "dot access on non-object");

    let err = eval_err("$a.missing", &ctx);
    assert_eq!(err.kind(), ErrorKind::Reference);
    assert_eq!(err.message(), "field 'missing' not found");
}

#[test]
fn array_indexing_rules() {
    let ctx = obj(&[(
        "items",
        Value::Array(vec![Value::Int(10), Value::Int(20)]),
    )]);
    assert_eq!(eval_ok("$items[1]", &ctx), Value::Int(20));
    assert_eq!(eval_ok("$items?[9]", &ctx), Value::Null);

    let err = eval_err("$items[9]", &ctx);
    assert_eq!(err.kind(), ErrorKind::ArrayOutOfBounds);
    assert_eq!(err.message(), "array index out of bounds");

    let err = eval_err("$items[\"x\"]", &ctx);
    assert_eq!(err.kind(), ErrorKind::Type);
    assert_eq!(err.message(), "array index must be numeric");

    let err = eval_err("$items.length", &ctx);
    assert_eq!(err.message(), "dot access on non-object");

    let err = eval_err("(1)[0]", &Map::new());
    assert_eq!(err.message(), "target is not an object or array");
}

#[test]
fn context_root_and_subscript() {
    let ctx = obj(&[("user name", Value::Str("ada".into())), ("n", Value::Int(1))]);
    assert_eq!(
        eval_ok("$[\"user name\"]", &ctx),
        Value::Str("ada".into())
    );
    assert_eq!(
        eval_ok("$", &ctx),
        Value::Object(ctx.clone())
    );
    assert_eq!(eval_ok("cond.isFieldPresent($, \"n\")", &ctx), Value::Bool(true));
}

#[test]
fn arithmetic_stays_within_numeric_variants() {
    assert_eq!(eval_ok("2 + 3 * 4", &Map::new()), Value::Int(14));
    assert_eq!(eval_ok("2.5 * 2.0", &Map::new()), Value::Float(5.0));
    assert_eq!(eval_ok("7 / 2", &Map::new()), Value::Int(3));
    assert_eq!(eval_ok("-7 / 2", &Map::new()), Value::Int(-3));
    assert_eq!(eval_ok("7.0 / 2.0", &Map::new()), Value::Float(3.5));
}

#[test]
fn mixed_numeric_arithmetic_requires_conversion() {
    let err = eval_err("1 + 2.5", &Map::new());
    assert_eq!(err.kind(), ErrorKind::Semantic);
    assert_eq!(
        err.to_string(),
        "SemanticError: Mixed numeric types require explicit conversion at line 1, column 3"
    );
    assert_eq!(eval_ok("type.float(1) + 2.5", &Map::new()), Value::Float(3.5));
    assert_eq!(eval_ok("1 + type.int(2.5)", &Map::new()), Value::Int(3));
}

#[test]
fn division_by_zero_is_its_own_kind() {
    let err = eval_err("1 / 0", &Map::new());
    assert_eq!(err.kind(), ErrorKind::DivideByZero);
    assert_eq!(err.message(), "division by zero");
    let err = eval_err("1.5 / 0.0", &Map::new());
    assert_eq!(err.kind(), ErrorKind::DivideByZero);
}

#[test]
fn non_numeric_arithmetic_is_semantic() {
    let err = eval_err("\"a\" + 1", &Map::new());
    assert_eq!(err.message(), "'+' operator used on non-numeric type");
    let err = eval_err("-\"a\"", &Map::new());
    assert_eq!(err.message(), "unary '-' operator requires a numeric operand");
    let err = eval_err("NOT 1", &Map::new());
    assert_eq!(err.message(), "NOT operator requires a boolean operand");
}

#[test]
fn relational_operators_cross_the_numeric_family() {
    assert_eq!(eval_ok("2 < 2.5", &Map::new()), Value::Bool(true));
    assert_eq!(eval_ok("\"abc\" < \"abd\"", &Map::new()), Value::Bool(true));
    assert_eq!(eval_ok("3 >= 3", &Map::new()), Value::Bool(true));
    let err = eval_err("\"a\" < 1", &Map::new());
    assert_eq!(err.kind(), ErrorKind::Semantic);
    assert_eq!(err.message(), "'<' operator not allowed on given types");
}

#[test]
fn equality_uses_tolerance_then_canonical_form() {
    assert_eq!(eval_ok("1 == 1.0", &Map::new()), Value::Bool(true));
    assert_eq!(eval_ok("0.3 == 0.1 + 0.2", &Map::new()), Value::Bool(true));
    assert_eq!(eval_ok("\"1\" == 1", &Map::new()), Value::Bool(true));
    assert_eq!(eval_ok("true == \"true\"", &Map::new()), Value::Bool(true));
    assert_eq!(eval_ok("null == null", &Map::new()), Value::Bool(true));
    assert_eq!(eval_ok("1 != 2", &Map::new()), Value::Bool(true));
}

#[test]
fn literals_and_collections_evaluate() {
    assert_eq!(
        eval_ok("[1, \"two\", null][1]", &Map::new()),
        Value::Str("two".into())
    );
    assert_eq!(
        eval_ok("{a: 1, \"b c\": 2}.a", &Map::new()),
        Value::Int(1)
    );
    assert_eq!(
        eval_ok("{a: 1, \"b c\": 2}[\"b c\"]", &Map::new()),
        Value::Int(2)
    );
}

#[test]
fn unknown_library_and_function() {
    let err = eval_err("nope.fn()", &Map::new());
    assert_eq!(err.kind(), ErrorKind::Reference);
    assert_eq!(err.message(), "library 'nope' not found");

    let err = eval_err("math.nope()", &Map::new());
    assert_eq!(err.kind(), ErrorKind::FunctionCall);
    assert_eq!(err.message(), "unknown math function 'nope'");
}

#[test]
fn arity_errors_point_at_paren_or_last_argument() {
    let err = eval_err("math.abs()", &Map::new());
    assert_eq!(err.kind(), ErrorKind::Parameter);
    assert_eq!(err.position(), Position::new(1, 9));

    let err = eval_err("math.abs(1, 2)", &Map::new());
    assert_eq!(err.position(), Position::new(1, 13));
}

#[test]
fn comments_and_newlines_in_expressions() {
    assert_eq!(eval_ok("1 +\n# add two\n2", &Map::new()), Value::Int(3));
    let err = eval_err("1 +\ntrue", &Map::new());
    assert_eq!(err.position(), Position::new(1, 3));
}

#[test]
fn library_pipelines_compose() {
    assert_eq!(
        eval_ok(
            "string.toUpper(string.join(string.split(\"a-b-c\", \"-\"), \"\"))",
            &Map::new()
        ),
        Value::Str("ABC".into())
    );
    assert_eq!(
        eval_ok(
            "time.getYear(time.parse(\"2021-06-15\", \"dateOnly\"))",
            &Map::new()
        ),
        Value::Int(2021)
    );
    assert_eq!(
        eval_ok(
            "array.extract(array.filter([{v: 1}, {v: null}, {w: 2}], \"v\"), \"v\")",
            &Map::new()
        ),
        Value::Array(vec![Value::Int(1)])
    );
    assert_eq!(
        eval_ok("cond.ifExpr($missing?.flag, 1, 2)", &obj(&[("missing", Value::Null)])),
        Value::Int(2)
    );
}

#[test]
fn bytecode_round_trip_preserves_semantics() {
    let source = "math.sum([1, 2, (3+4)]) == 10.0 && $flag";
    let ctx = obj(&[("flag", Value::Bool(true))]);
    let direct = eval(source, &ctx).unwrap();

    let bytes = export_tokens(source).unwrap();
    let expr = Parser::new(ByteCodeReader::new(bytes)).unwrap().parse().unwrap();
    let decoded = evaluate(&expr, &ctx, &Environment::new()).unwrap();
    assert_eq!(direct, decoded);
}

#[test]
fn bytecode_errors_lose_positions() {
    let bytes = export_tokens("$missing").unwrap();
    let expr = Parser::new(ByteCodeReader::new(bytes)).unwrap().parse().unwrap();
    let err = evaluate(&expr, &Map::new(), &Environment::new()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Reference);
    assert_eq!(err.position(), Position::UNKNOWN);
}

#[test]
fn signed_streams_verify_and_detect_tampering() {
    let mut rng = rand::thread_rng();
    let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("key generation failed");
    let public_key = RsaPublicKey::from(&private_key);

    let signed = export_tokens_signed("1 + 2", &private_key).unwrap();
    let reader = ByteCodeReader::from_signed(&signed, &public_key).unwrap();
    let expr = Parser::new(reader).unwrap().parse().unwrap();
    assert_eq!(
        evaluate(&expr, &Map::new(), &Environment::new()).unwrap(),
        Value::Int(3)
    );

    // Flip one byte inside the token stream.
    let mut tampered = signed.clone();
    tampered[8] ^= 0x01;
    let err = ByteCodeReader::from_signed(&tampered, &public_key).unwrap_err();
    assert!(err.to_string().starts_with("invalid signature:"));

    // Flip one byte inside the signature.
    let mut tampered = signed.clone();
    let last = tampered.len() - 1;
    tampered[last] ^= 0x01;
    let err = ByteCodeReader::from_signed(&tampered, &public_key).unwrap_err();
    assert!(err.to_string().starts_with("invalid signature:"));

    // A wrong magic fails before any verification.
    let mut tampered = signed;
    tampered[0] = b'X';
    let err = ByteCodeReader::from_signed(&tampered, &public_key).unwrap_err();
    assert!(err.to_string().starts_with("invalid header magic"));
}

#[test]
fn shared_asts_evaluate_across_threads() {
    let expr = std::sync::Arc::new(parse("$n * $n").unwrap());
    let env = std::sync::Arc::new(Environment::new());
    let handles: Vec<_> = (1..=4i64)
        .map(|n| {
            let expr = expr.clone();
            let env = env.clone();
            std::thread::spawn(move || {
                let ctx = obj(&[("n", Value::Int(n))]);
                evaluate(&expr, &ctx, &env).unwrap()
            })
        })
        .collect();
    let results: Vec<Value> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(
        results,
        vec![Value::Int(1), Value::Int(4), Value::Int(9), Value::Int(16)]
    );
}
