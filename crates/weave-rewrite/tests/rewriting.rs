use weave_pointcut::{AspectSpec, Matcher};
use weave_program::{FrontEnd, GoFrontEnd, TargetProgram};
use weave_rewrite::{
    rewrite_unit, CodegenOptions, NamingScheme, RewriteError, RewrittenUnit, WeaveSession,
};
use weave_test_utils::{GoWorkspace, MAIN_GO};

fn load(ws: &GoWorkspace, target: &str) -> TargetProgram {
    GoFrontEnd::new().load(ws.root(), target).unwrap()
}

fn rewrite_main(
    program: &TargetProgram,
    spec: &AspectSpec,
    session: &mut WeaveSession,
) -> Result<Option<RewrittenUnit>, RewriteError> {
    let set = Matcher::from_spec(spec).match_all(program);
    let main = &program.units[0];
    assert_eq!(main.relative_path.to_str(), Some("main.go"));
    let options = CodegenOptions::for_layout(&program.layout, "agaspect");
    rewrite_unit(program, main, &set.for_unit(main.id), session, &options)
}

#[test]
fn functions_become_immediately_invoked_generators() {
    let ws = GoWorkspace::sample_app();
    let program = load(&ws, "example.com/app");
    let spec =
        AspectSpec::default().with_aspect("Trace", r"example\.com/app\.(sayHello|divide|sum)");
    let mut session = WeaveSession::new(NamingScheme::Sequential);
    let unit = rewrite_main(&program, &spec, &mut session).unwrap().unwrap();

    assert!(unit.body.contains("\t(_ag_pgen_ag_proxy_0())(\"world\")\n"));
    assert!(unit.body.contains("q, err := (_ag_pgen_ag_proxy_1())(6, 3)"));
    assert!(unit.body.contains("fmt.Println(q, err, (_ag_pgen_ag_proxy_2())(1, 2, 3))"));
    // Declarations themselves are left alone.
    assert!(unit.body.contains("func divide(a, b int) (int, error) {"));
    assert!(unit.body.contains("func sum(xs ...int) int {"));

    let names: Vec<&str> = unit.proxies.iter().map(|p| p.names.proxy.as_str()).collect();
    assert_eq!(names, vec!["_ag_proxy_0", "_ag_proxy_1", "_ag_proxy_2"]);
    assert!(unit.proxies[1]
        .proxy
        .starts_with("func _ag_proxy_1(_ag_p0 int, _ag_p1 int) (int, error) {"));
    assert!(unit.proxies[2].proxy.contains("_ag_res0 := sum(_ag_arg0...)"));
}

#[test]
fn support_imports_follow_the_package_clause() {
    let ws = GoWorkspace::sample_app();
    let program = load(&ws, "example.com/app");
    let spec = AspectSpec::default().with_aspect("Trace", r"example\.com/app\.sayHello");
    let mut session = WeaveSession::new(NamingScheme::Sequential);
    let unit = rewrite_main(&program, &spec, &mut session).unwrap().unwrap();

    assert!(unit.body.starts_with(
        "package main\n\nimport (\n\taspectrt \"golang.org/x/exp/aspectgo/aspect/rt\"\n\tagaspect \"example.com/app/agaspect\"\n)\n\nimport (\n\t\"fmt\"\n"
    ));
}

#[test]
fn method_values_capture_receiver_at_reference() {
    let ws = GoWorkspace::sample_app();
    let program = load(&ws, "example.com/app");
    let spec = AspectSpec::default().with_aspect("Det", r"\(\*example\.com/app/worker\.W\)\.Do");
    let mut session = WeaveSession::new(NamingScheme::Sequential);
    let unit = rewrite_main(&program, &spec, &mut session).unwrap().unwrap();

    assert!(unit.body.contains("f := (_ag_pgen_ag_proxy_0(o))\n"));
    assert!(unit.body.contains("o = &worker.W{N: 2}"));
    assert!(unit.body.contains("(_ag_pgen_ag_proxy_1(worker.New(3)))(1)"));

    let generator = &unit.proxies[0].generator;
    assert!(generator.starts_with("func _ag_pgen_ag_proxy_0(_ag_recv *worker.W) func(int) int {"));
    assert!(unit.proxies[0].proxy.contains("XReceiver: _ag_recv,"));
}

#[test]
fn nested_references_are_rewritten_inside_out() {
    let ws = GoWorkspace::sample_app();
    let program = load(&ws, "example.com/app");
    let spec = AspectSpec::default()
        .with_aspect("New", r"example\.com/app/worker\.New")
        .with_aspect("Det", r"\(\*example\.com/app/worker\.W\)\.Do");
    let mut session = WeaveSession::new(NamingScheme::Sequential);
    let unit = rewrite_main(&program, &spec, &mut session).unwrap().unwrap();

    assert!(unit
        .body
        .contains("(_ag_pgen_ag_proxy_2((_ag_pgen_ag_proxy_1())(3)))(1)"));
    let names: Vec<&str> = unit.proxies.iter().map(|p| p.names.proxy.as_str()).collect();
    assert_eq!(names, vec!["_ag_proxy_0", "_ag_proxy_1", "_ag_proxy_2"]);
    assert!(unit.proxies[1]
        .proxy
        .contains("_ag_res0 := worker.New(_ag_arg0)"));
}

#[test]
fn names_stay_unique_across_units_of_a_session() {
    let ws = GoWorkspace::sample_app();
    ws.write(
        "extra.go",
        "package main\n\nfunc again() {\n\tsayHello(\"again\")\n}\n",
    );
    let program = load(&ws, "example.com/app");
    let spec = AspectSpec::default().with_aspect("Trace", r"example\.com/app\.sayHello");
    let set = Matcher::from_spec(&spec).match_all(&program);
    let options = CodegenOptions::for_layout(&program.layout, "agaspect");
    let mut session = WeaveSession::new(NamingScheme::Sequential);

    let mut proxies = Vec::new();
    for unit in program.woven_units() {
        if let Some(rewritten) =
            rewrite_unit(&program, unit, &set.for_unit(unit.id), &mut session, &options).unwrap()
        {
            proxies.extend(rewritten.proxies.into_iter().map(|p| p.names.proxy));
        }
    }
    proxies.sort();
    assert_eq!(proxies, vec!["_ag_proxy_0", "_ag_proxy_1"]);
}

#[test]
fn content_naming_is_stable_between_runs() {
    let ws = GoWorkspace::sample_app();
    let program = load(&ws, "example.com/app");
    let spec = AspectSpec::default().with_aspect("Trace", r"example\.com/app\.sayHello");

    let first = rewrite_main(&program, &spec, &mut WeaveSession::new(NamingScheme::Content))
        .unwrap()
        .unwrap();
    let second = rewrite_main(&program, &spec, &mut WeaveSession::new(NamingScheme::Content))
        .unwrap()
        .unwrap();
    assert_eq!(first.body, second.body);
    assert!(first.proxies[0].names.proxy.starts_with("_ag_proxy_"));
    assert_ne!(first.proxies[0].names.proxy, "_ag_proxy_0");
}

#[test]
fn units_without_join_points_are_untouched() {
    let ws = GoWorkspace::sample_app();
    let program = load(&ws, "example.com/app");
    let spec = AspectSpec::default().with_aspect("None", r"nothing");
    let mut session = WeaveSession::default();
    assert!(rewrite_main(&program, &spec, &mut session).unwrap().is_none());
    assert_eq!(session.issued_count(), 0);
    assert_eq!(ws.read("main.go"), MAIN_GO);
}

#[test]
fn method_expressions_are_fatal_with_location() {
    let ws = GoWorkspace::module("example.com/mexpr");
    ws.write(
        "main.go",
        r#"package main

type T struct{}

func (T) Get() int { return 1 }

func main() {
	g := T.Get
	_ = g(T{})
}
"#,
    );
    let program = load(&ws, "example.com/mexpr");
    let spec = AspectSpec::default().with_aspect("A", r".*Get");
    let mut session = WeaveSession::default();
    let err = rewrite_main(&program, &spec, &mut session).unwrap_err();

    assert!(matches!(err, RewriteError::UnexpectedReferenceShape { .. }));
    assert_eq!(err.location().line, 8);
    assert!(err.to_string().contains("method expression"));
}

#[test]
fn value_receivers_are_dereferenced_from_pointers() {
    let ws = GoWorkspace::module("example.com/vals");
    ws.write(
        "main.go",
        r#"package main

type Counter struct {
	n int
}

func (c Counter) Value() int { return c.n }

func main() {
	c := &Counter{n: 1}
	v := c.Value
	_ = v()
}
"#,
    );
    let program = load(&ws, "example.com/vals");
    let spec = AspectSpec::default().with_aspect("A", r"\(example\.com/vals\.Counter\)\.Value");
    let mut session = WeaveSession::default();
    let unit = rewrite_main(&program, &spec, &mut session).unwrap().unwrap();

    assert!(unit.body.contains("v := (_ag_pgen_ag_proxy_0(*c))"));
    assert!(unit.proxies[0]
        .proxy
        .starts_with("func _ag_proxy_0(_ag_recv Counter) int {"));
}
