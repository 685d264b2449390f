use super::Emitter;
use super::ir::{ClassRef, ContainerUnit, Expr, Method, Stmt};

const MEMBER: &str = "    ";
const BODY: &str = "        ";

/// Renders a [`ContainerUnit`] as a PHP class.
#[derive(Debug, Default, Clone, Copy)]
pub struct PhpEmitter;

impl Emitter for PhpEmitter {
    fn emit(&self, unit: &ContainerUnit) -> String {
        let mut out = format!(
            "class {} extends {}\n{{\n{MEMBER}protected $shared = [];\n",
            unit.class, unit.base_class
        );

        if unit.has_parameters() {
            out.push_str(&format!(
                "\n{MEMBER}public function __construct()\n{MEMBER}{{\n{BODY}parent::__construct($this->getDefaultParameters());\n{MEMBER}}}\n"
            ));
        }

        for method in &unit.methods {
            out.push_str(&method_code(method));
        }

        if unit.has_parameters() {
            out.push_str(&format!(
                "\n{MEMBER}protected function getDefaultParameters()\n{MEMBER}{{\n{BODY}return [\n"
            ));
            for (name, value) in &unit.default_parameters {
                out.push_str(&format!(
                    "{BODY}{MEMBER}{} => {},\n",
                    quote(name),
                    expr(value, true)
                ));
            }
            out.push_str(&format!("{BODY}];\n{MEMBER}}}\n"));
        }

        out.push_str("}\n");
        out
    }
}

fn method_code(method: &Method) -> String {
    let mut out = format!(
        "\n{MEMBER}protected function {}()\n{MEMBER}{{\n",
        method.name
    );
    for stmt in &method.body {
        out.push_str(&stmt_code(stmt));
    }
    out.push_str(&format!("{MEMBER}}}\n"));
    out
}

fn stmt_code(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Require(file) => format!("{BODY}require_once {};\n\n", expr(file, false)),
        Stmt::SharedGuard { id } => {
            let slot = quote(id);
            format!(
                "{BODY}if (isset($this->shared[{slot}])) {{\n{BODY}{MEMBER}return $this->shared[{slot}];\n{BODY}}}\n\n"
            )
        }
        Stmt::Assign { var, value } => format!("{BODY}${var} = {};\n", expr(value, false)),
        Stmt::Eval(value) => format!("{BODY}{};\n", expr(value, false)),
        Stmt::Return(value) => format!("\n{BODY}return {};\n", expr(value, false)),
        Stmt::ReturnShared { id, value } => format!(
            "\n{BODY}return $this->shared[{}] = {};\n",
            quote(id),
            expr(value, false)
        ),
        Stmt::Forward(value) => format!("{BODY}return {};\n", expr(value, false)),
    }
}

/// Spell one expression. `trailing` adds a delimiter after the last array
/// element, as used by the exported parameter bag.
fn expr(value: &Expr, trailing: bool) -> String {
    match value {
        Expr::Null => "null".to_string(),
        Expr::Bool(value) => value.to_string(),
        Expr::Integer(value) => value.to_string(),
        Expr::Float(value) => float(*value),
        Expr::Str(value) => quote(value),
        Expr::List(items) => array(items.iter().map(|item| expr(item, trailing)), trailing),
        Expr::Map(entries) => array(
            entries
                .iter()
                .map(|(key, item)| format!("{} => {}", quote(key), expr(item, trailing))),
            trailing,
        ),
        Expr::Concat(parts) => parts
            .iter()
            .map(|part| expr(part, trailing))
            .collect::<Vec<_>>()
            .join("."),
        Expr::Container => "$this".to_string(),
        Expr::Service(id) => format!("$this->getService({})", quote(id)),
        Expr::MissingService(id) => format!("/* missing */ $this->getService({})", quote(id)),
        Expr::Parameter(name) => format!("$this->getParameter({})", quote(name)),
        Expr::Var(name) => format!("${name}"),
        Expr::New { class, arguments } => {
            let class = match class {
                ClassRef::Named(name) => name.clone(),
                ClassRef::Var(var) => format!("${var}"),
            };
            format!("new {class}({})", arguments_code(arguments))
        }
        Expr::StaticCall {
            class,
            method,
            arguments,
        } => {
            let mut code = format!("call_user_func([{}, {}]", expr(class, false), quote(method));
            if !arguments.is_empty() {
                code.push_str(", ");
                code.push_str(&arguments_code(arguments));
            }
            code.push(')');
            code
        }
        Expr::MethodCall {
            target,
            method,
            arguments,
        } => format!("{}->{method}({})", expr(target, false), arguments_code(arguments)),
        Expr::FunctionCall { name, arguments } => format!("{name}({})", arguments_code(arguments)),
        Expr::ServiceReference(id) => format!("new ServiceReference({})", quote(id)),
    }
}

fn arguments_code(arguments: &[Expr]) -> String {
    arguments
        .iter()
        .map(|argument| expr(argument, false))
        .collect::<Vec<_>>()
        .join(", ")
}

fn array(items: impl Iterator<Item = String>, trailing: bool) -> String {
    let items: Vec<String> = items.collect();
    if items.is_empty() {
        return "[]".to_string();
    }
    if trailing {
        format!("[{}, ]", items.join(", "))
    } else {
        format!("[{}]", items.join(", "))
    }
}

fn quote(value: &str) -> String {
    format!("'{}'", value.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn float(value: f64) -> String {
    if value.is_nan() {
        "NAN".to_string()
    } else if value == f64::INFINITY {
        "INF".to_string()
    } else if value == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        format!("{value:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn spells_scalars_and_arrays() {
        assert_eq!(expr(&Expr::Float(1000.3), false), "1000.3");
        assert_eq!(expr(&Expr::Float(1.0), false), "1.0");
        assert_eq!(expr(&Expr::Str("it's a\\b".into()), false), "'it\\'s a\\\\b'");
        let list = Expr::List(vec![Expr::Bool(true), Expr::Null, Expr::Integer(0)]);
        assert_eq!(expr(&list, false), "[true, null, 0]");
        assert_eq!(expr(&list, true), "[true, null, 0, ]");
        let map = Expr::Map(vec![("a".into(), Expr::Service("foo".into()))]);
        assert_eq!(expr(&map, false), "['a' => $this->getService('foo')]");
    }

    #[test]
    fn spells_calls() {
        let call = Expr::StaticCall {
            class: Box::new(Expr::Str("FooClass".into())),
            method: "getInstance".into(),
            arguments: vec![],
        };
        assert_eq!(expr(&call, false), "call_user_func(['FooClass', 'getInstance'])");
        let concat = Expr::Concat(vec![Expr::Parameter("path".into()), Expr::Str("/a.php".into())]);
        assert_eq!(expr(&concat, false), "$this->getParameter('path').'/a.php'");
    }
}
