use linnet::error::{self, ExecutionError, RuntimeErrorKind};
use linnet::{Interpreter, Mode};
use pretty_assertions::assert_eq;

type TestResult = error::GenericResult<()>;

// run code on a fresh interpreter, returning whatever it printed along with the outcome
fn execute_in(mode: Mode, code: &str) -> (String, linnet::ExecutionResult) {
    let mut buffer = Vec::new();
    let result = {
        let mut interpreter = Interpreter::with_mode(&mut buffer, mode);
        linnet::execute(code, &mut interpreter)
    };
    (String::from_utf8_lossy(&buffer).into_owned(), result)
}

fn run(code: &str) -> error::GenericResult<String> {
    let (output, result) = execute_in(Mode::Script, code);
    result?;
    Ok(output)
}

// run code that is expected to fail, returning the output produced before the failure
fn run_err(code: &str) -> (String, ExecutionError) {
    match execute_in(Mode::Script, code) {
        (output, Ok(())) => panic!("expected an error, program printed {output:?}"),
        (output, Err(error)) => (output, error),
    }
}

fn runtime_kind(error: &ExecutionError) -> &RuntimeErrorKind {
    match error {
        ExecutionError::Runtime(runtime) => &runtime.kind,
        ExecutionError::Static(errors) => panic!("expected a runtime error, got {errors:?}"),
    }
}

#[test]
fn variable_scoping() -> TestResult {
    let code = "\
        var a = \"global a\";\n\
        var b = \"global b\";\n\
        var c = \"global c\";\n\
        {\n\
            var a = \"outer a\";\n\
            var b = \"outer b\";\n\
            {\n\
                var a = \"inner a\";\n\
                print a;\n\
                print b;\n\
                print c;\n\
            }\n\
            print a;\n\
            print b;\n\
            print c;\n\
        }\n\
        print a;\n\
        print b;\n\
        print c;";

    let output = run(code)?;

    let expected = "\
        inner a\n\
        outer b\n\
        global c\n\
        outer a\n\
        outer b\n\
        global c\n\
        global a\n\
        global b\n\
        global c\n";

    assert_eq!(expected, output);

    Ok(())
}

#[test]
fn shadowing() -> TestResult {
    let output = run("var x = 1; { var x = 2; print x; } print x;")?;
    assert_eq!("2\n1\n", output);
    Ok(())
}

#[test]
fn reassignment() -> TestResult {
    let code = "\
        var a = \"original\";\n\
        a = \"updated\";\n\
        print a;";

    assert_eq!("updated\n", run(code)?);

    Ok(())
}

#[test]
fn uninitialized_variable_is_nil() -> TestResult {
    assert_eq!("nil\n", run("var a; print a;")?);
    Ok(())
}

#[test]
fn arithmetic() -> TestResult {
    let code = "\
        print 1 + 2 * 3;\n\
        print (1 + 2) * 3;\n\
        print 10 / 4;\n\
        print 7 - 10;\n\
        print -3 + 1;\n\
        print 2 * -(1 + 1);";

    let expected = "\
        7\n\
        9\n\
        2.5\n\
        -3\n\
        -2\n\
        -4\n";

    assert_eq!(expected, run(code)?);

    Ok(())
}

#[test]
fn comparison_and_equality() -> TestResult {
    let code = "\
        print 1 < 2;\n\
        print 2 <= 2;\n\
        print 1 > 2;\n\
        print 3 >= 4;\n\
        print 1 == 1;\n\
        print \"a\" == \"a\";\n\
        print nil == nil;\n\
        print 1 == \"1\";\n\
        print nil == false;\n\
        print 1 != 2;";

    let expected = "\
        true\n\
        true\n\
        false\n\
        false\n\
        true\n\
        true\n\
        true\n\
        false\n\
        false\n\
        true\n";

    assert_eq!(expected, run(code)?);

    Ok(())
}

#[test]
fn functions_are_equal_only_to_themselves() -> TestResult {
    let code = "\
        fun f() {}\n\
        fun h() {}\n\
        var g = f;\n\
        print f == g;\n\
        print f == h;";

    assert_eq!("true\nfalse\n", run(code)?);

    Ok(())
}

#[test]
fn division_by_zero() {
    let (output, error) = run_err("print \"before\"; print 1 / 0; print \"after\";");

    assert_eq!("before\n", output);
    assert_eq!(&RuntimeErrorKind::DivisionByZero, runtime_kind(&error));
    assert_eq!("Division by zero.\n[line 1]", error.to_string());
    assert_eq!(70, error.exit_code());
}

#[test]
fn string_concatenation() -> TestResult {
    let code = "\
        print \"a\" + 1;\n\
        print 1 + \"a\";\n\
        print \"n: \" + 2.5;\n\
        print \"x\" + nil;\n\
        print \"t\" + true;\n\
        print \"con\" + \"cat\";";

    let expected = "\
        a1\n\
        1a\n\
        n: 2.5\n\
        xnil\n\
        ttrue\n\
        concat\n";

    assert_eq!(expected, run(code)?);

    Ok(())
}

#[test]
fn invalid_addition() {
    let (_, error) = run_err("print true + 1;");

    assert_eq!(&RuntimeErrorKind::InvalidAddition, runtime_kind(&error));
    assert_eq!(
        "Operands must be two numbers or at least one string.\n[line 1]",
        error.to_string()
    );
}

#[test]
fn operand_type_errors() {
    let (_, error) = run_err("print \"a\" - 1;");
    assert_eq!(&RuntimeErrorKind::OperandsNotNumbers, runtime_kind(&error));

    let (_, error) = run_err("print nil < 1;");
    assert_eq!(&RuntimeErrorKind::OperandsNotNumbers, runtime_kind(&error));

    let (_, error) = run_err("\n\nprint -\"a\";");
    assert_eq!(&RuntimeErrorKind::OperandNotNumber, runtime_kind(&error));
    assert_eq!("Operand must be a number.\n[line 3]", error.to_string());
}

#[test]
fn runtime_error_stops_the_program() {
    let code = "\
        print \"one\";\n\
        print nil - 1;\n\
        print \"two\";";

    let (output, error) = run_err(code);

    assert_eq!("one\n", output);
    assert_eq!("Operands must be numbers.\n[line 2]", error.to_string());
}

#[test]
fn undefined_variable() {
    let (_, error) = run_err("print missing;");
    assert_eq!("Undefined variable 'missing'.\n[line 1]", error.to_string());

    let (_, error) = run_err("missing = 1;");
    assert_eq!(
        &RuntimeErrorKind::UndefinedVariable("missing".to_string()),
        runtime_kind(&error)
    );
}

#[test]
fn truthiness() -> TestResult {
    let code = "\
        if (0) print \"zero\"; else print \"zero is falsy\";\n\
        if (\"\") print \"empty string is truthy\";\n\
        if (nil) print \"nil\"; else print \"nil is falsy\";\n\
        print !0;\n\
        print !1;\n\
        print !nil;";

    let expected = "\
        zero is falsy\n\
        empty string is truthy\n\
        nil is falsy\n\
        true\n\
        false\n\
        true\n";

    assert_eq!(expected, run(code)?);

    Ok(())
}

#[test]
fn logical_operators_short_circuit() -> TestResult {
    let code = "\
        print nil or \"default\";\n\
        print \"first\" or \"second\";\n\
        print 1 and 2;\n\
        print false and neverEvaluated;\n\
        print true or neverEvaluated;";

    let expected = "\
        default\n\
        first\n\
        2\n\
        false\n\
        true\n";

    assert_eq!(expected, run(code)?);

    Ok(())
}

#[test]
fn ternary() -> TestResult {
    let code = "\
        print 1 ? \"yes\" : \"no\";\n\
        print 0 ? \"yes\" : \"no\";\n\
        print nil ? \"yes\" : \"no\";\n\
        print false ? 1 : true ? 2 : 3;\n\
        print 1 ? \"only\";\n\
        print 0 ? \"only\";";

    let expected = "\
        yes\n\
        no\n\
        no\n\
        2\n\
        only\n\
        nil\n";

    assert_eq!(expected, run(code)?);

    Ok(())
}

#[test]
fn comma_sequence() -> TestResult {
    let code = "\
        var a = 0;\n\
        a = 1, a = a + 1;\n\
        print a;\n\
        fun last() { return 1, 2, 3; }\n\
        print last();";

    assert_eq!("2\n3\n", run(code)?);

    Ok(())
}

#[test]
fn if_statement() -> TestResult {
    let code = "\
        var a = \"do it\";\n\
        if (a == \"do it\") {\n\
            print \"condition was true\";\n\
        } else {\n\
            print \"condition was false\";\n\
        }\n\
        if (a == \"don't\") print \"wrong\"; else print \"else branch\";";

    assert_eq!("condition was true\nelse branch\n", run(code)?);

    Ok(())
}

#[test]
fn while_loop() -> TestResult {
    let code = "\
        var i = 0;\n\
        while (i < 3) {\n\
            print i;\n\
            i = i + 1;\n\
        }";

    assert_eq!("0\n1\n2\n", run(code)?);

    Ok(())
}

#[test]
fn for_loop() -> TestResult {
    let output = run("for (var i = 0; i < 3; i = i + 1) print i;")?;
    assert_eq!("0\n1\n2\n", output);
    Ok(())
}

#[test]
fn for_loop_variable_is_scoped_to_the_loop() {
    let (output, error) = run_err("for (var i = 0; i < 1; i = i + 1) {} print i;");

    assert_eq!("", output);
    assert_eq!("Undefined variable 'i'.\n[line 1]", error.to_string());
}

#[test]
fn fibonacci() -> TestResult {
    let code = "\
        var a = 0;\n\
        var temp;\n\
        for (var b = 1; a < 100; b = temp + b) {\n\
            print a;\n\
            temp = a;\n\
            a = b;\n\
        }";

    let expected = "0\n1\n1\n2\n3\n5\n8\n13\n21\n34\n55\n89\n";

    assert_eq!(expected, run(code)?);

    Ok(())
}

#[test]
fn recursive_function() -> TestResult {
    let code = "\
        fun fib(n) {\n\
            if (n < 2) return n;\n\
            return fib(n - 1) + fib(n - 2);\n\
        }\n\
        print fib(10);";

    assert_eq!("55\n", run(code)?);

    Ok(())
}

#[test]
fn local_recursive_function() -> TestResult {
    let code = "\
        {\n\
            fun fact(n) { return n <= 1 ? 1 : n * fact(n - 1); }\n\
            print fact(5);\n\
        }";

    assert_eq!("120\n", run(code)?);

    Ok(())
}

#[test]
fn functions_without_return_value_yield_nil() -> TestResult {
    let code = "\
        fun empty() {}\n\
        fun declared();\n\
        fun bare() { return; }\n\
        print empty();\n\
        print declared();\n\
        print bare();";

    assert_eq!("nil\nnil\nnil\n", run(code)?);

    Ok(())
}

#[test]
fn return_unwinds_nested_loops() -> TestResult {
    let code = "\
        fun firstOver(limit) {\n\
            var i = 0;\n\
            while (true) {\n\
                for (var j = 0; j < 100; j = j + 1) {\n\
                    i = i + 1;\n\
                    if (i > limit) return i;\n\
                }\n\
            }\n\
        }\n\
        print firstOver(5);\n\
        print \"after\";";

    assert_eq!("6\nafter\n", run(code)?);

    Ok(())
}

#[test]
fn closure_counter() -> TestResult {
    let code = "\
        fun makeCounter() {\n\
            var i = 0;\n\
            fun count() {\n\
                i = i + 1;\n\
                return i;\n\
            }\n\
            return count;\n\
        }\n\
        var counter = makeCounter();\n\
        print counter();\n\
        print counter();\n\
        var other = makeCounter();\n\
        print other();\n\
        print counter();";

    assert_eq!("1\n2\n1\n3\n", run(code)?);

    Ok(())
}

#[test]
fn closure_binds_to_the_scope_at_declaration() -> TestResult {
    let code = "\
        var a = \"global\";\n\
        {\n\
            fun showA() {\n\
                print a;\n\
            }\n\
            showA();\n\
            var a = \"block\";\n\
            showA();\n\
            print a;\n\
        }";

    assert_eq!("global\nglobal\nblock\n", run(code)?);

    Ok(())
}

#[test]
fn closures_share_captured_variables() -> TestResult {
    let code = "\
        var get;\n\
        var set;\n\
        {\n\
            var shared = \"initial\";\n\
            fun getter() { return shared; }\n\
            fun setter(value) { shared = value; }\n\
            get = getter;\n\
            set = setter;\n\
        }\n\
        print get();\n\
        set(\"changed\");\n\
        print get();";

    assert_eq!("initial\nchanged\n", run(code)?);

    Ok(())
}

#[test]
fn arity_mismatch() {
    let (_, error) = run_err("fun f(a, b) {}\nf(1);");

    assert_eq!(
        &RuntimeErrorKind::ArityMismatch {
            expected: 2,
            found: 1
        },
        runtime_kind(&error)
    );
    assert_eq!("Expected 2 arguments but got 1.\n[line 2]", error.to_string());
}

#[test]
fn calling_a_non_function() {
    let (_, error) = run_err("var s = \"str\"; s();");

    assert_eq!(&RuntimeErrorKind::NotCallable, runtime_kind(&error));
    assert_eq!("Can only call functions.\n[line 1]", error.to_string());
}

#[test]
fn printing_callables() -> TestResult {
    let code = "\
        fun greet() {}\n\
        print greet;\n\
        print clock;";

    assert_eq!("<fn greet>\n<native fn>\n", run(code)?);

    Ok(())
}

#[test]
fn native_functions() -> TestResult {
    let code = "\
        print sqrt(16);\n\
        print toString(12) + \"!\";\n\
        print toString(nil);\n\
        print clock() >= 0;";

    assert_eq!("4\n12!\nnil\ntrue\n", run(code)?);

    Ok(())
}

#[test]
fn native_function_errors() {
    let (_, error) = run_err("sqrt(-1);");
    assert_eq!(&RuntimeErrorKind::NegativeSqrt, runtime_kind(&error));

    let (_, error) = run_err("sqrt(\"four\");");
    assert_eq!(&RuntimeErrorKind::OperandNotNumber, runtime_kind(&error));

    let (_, error) = run_err("clock(1);");
    assert_eq!(
        &RuntimeErrorKind::ArityMismatch {
            expected: 0,
            found: 1
        },
        runtime_kind(&error)
    );
}

#[test]
fn natives_can_be_shadowed() -> TestResult {
    assert_eq!("shadowed\n", run("var clock = \"shadowed\"; print clock;")?);
    Ok(())
}

#[test]
fn reading_a_local_in_its_own_initializer() {
    let (output, error) = run_err("print \"never\";\n{ var a = a; }");

    assert_eq!("", output);
    assert_eq!(
        "[line 2] Error at 'a': Can't read local variable in its own initializer.",
        error.to_string()
    );
    assert_eq!(65, error.exit_code());
}

#[test]
fn global_self_reference_is_not_a_static_error() {
    let (_, error) = run_err("var a = a;");
    assert_eq!(
        &RuntimeErrorKind::UndefinedVariable("a".to_string()),
        runtime_kind(&error)
    );
}

#[test]
fn duplicate_declaration_in_block() {
    let (_, error) = run_err("{ var a = 1; var a = 2; }");

    assert_eq!(
        "[line 1] Error at 'a': Already a variable with this name in this scope.",
        error.to_string()
    );
}

#[test]
fn duplicate_parameter() {
    let (_, error) = run_err("fun f(a, a) {}");

    assert_eq!(
        "[line 1] Error at 'a': Already a variable with this name in this scope.",
        error.to_string()
    );
}

#[test]
fn duplicate_declaration_at_global_scope() -> TestResult {
    assert_eq!("2\n", run("var a = 1; var a = 2; print a;")?);
    Ok(())
}

#[test]
fn return_at_top_level() {
    let (_, error) = run_err("return 1;");
    assert_eq!(
        "[line 1] Error at 'return': Can't return from top-level code.",
        error.to_string()
    );

    let (_, error) = run_err("{ return; }");
    assert_eq!(65, error.exit_code());
}

#[test]
fn all_parse_errors_are_reported() {
    let code = "\
        print ;\n\
        print 1 +;\n\
        var = 3;\n\
        print \"fine\";";

    let (output, error) = run_err(code);

    assert_eq!("", output);
    let ExecutionError::Static(errors) = &error else {
        panic!("expected static errors, got {error:?}");
    };
    assert_eq!(3, errors.len());
    assert_eq!(
        "\
        [line 1] Error at ';': Expect expression.\n\
        [line 2] Error at ';': Expect expression.\n\
        [line 3] Error at '=': Expect variable name.",
        error.to_string()
    );
}

#[test]
fn lexical_errors_are_reported_with_parse_errors() {
    let (_, error) = run_err("print 1 @ 2;");
    assert_eq!(
        "[line 1] Error: Unexpected character.\n[line 1] Error at '2': Expect ';' after value.",
        error.to_string()
    );

    let (_, error) = run_err("print \"abc");
    assert_eq!(
        "[line 1] Error: Unterminated string.\n[line 1] Error at end: Expect expression.",
        error.to_string()
    );
}

#[test]
fn missing_left_operand() {
    let (_, error) = run_err("print * 3;");
    assert_eq!("[line 1] Error at '*': Expected expression before '*'.", error.to_string());

    let (_, error) = run_err("print == 1;");
    assert_eq!("[line 1] Error at '==': Expected expression before '=='.", error.to_string());

    let (_, error) = run_err("? 1 : 2;");
    assert_eq!("[line 1] Error at '?': Expected expression before '?'.", error.to_string());
}

#[test]
fn invalid_assignment_target() {
    let (_, error) = run_err("var a = 1; a + 1 = 3;");
    assert_eq!("[line 1] Error at '=': Invalid assignment target.", error.to_string());
}

#[test]
fn script_mode_does_not_echo_expressions() -> TestResult {
    assert_eq!("", run("1 + 2;")?);
    Ok(())
}
