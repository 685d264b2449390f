//! Container dumps checked against complete expected classes.

use keystone_rs_container::{
    Configurator, ContainerBuilder, ContainerDumper, DumpError, DumpOptions, ServicesLoader, Value,
};
use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;

#[test]
fn empty_container_is_a_bare_class() {
    let builder = ContainerBuilder::new();
    let dumper = ContainerDumper::new(&builder);
    assert_eq!(
        dumper.dump(&DumpOptions::default()).expect("dump"),
        "class ProjectServiceContainer extends ServiceContainer\n{\n    protected $shared = [];\n}\n"
    );
    let options = DumpOptions::default()
        .with_class("Container")
        .with_base_class("AbstractContainer");
    assert_eq!(
        dumper.dump(&options).expect("dump"),
        "class Container extends AbstractContainer\n{\n    protected $shared = [];\n}\n"
    );
}

#[test]
fn parameters_add_a_constructor_and_defaults() {
    let mut builder = ContainerBuilder::new();
    builder.set_parameter("FOO", "bar");
    builder.set_parameter("bar", "foo is %foo bar");
    builder.set_parameter(
        "values",
        Value::List(vec![
            Value::Bool(true),
            Value::Bool(false),
            Value::Null,
            Value::Integer(0),
            Value::Float(1000.3),
            Value::from("true"),
            Value::from("false"),
            Value::from("null"),
        ]),
    );

    let expected = "class ProjectServiceContainer extends ServiceContainer
{
    protected $shared = [];

    public function __construct()
    {
        parent::__construct($this->getDefaultParameters());
    }

    protected function getDefaultParameters()
    {
        return [
            'foo' => 'bar',
            'bar' => 'foo is %foo bar',
            'values' => [true, false, null, 0, 1000.3, 'true', 'false', 'null', ],
        ];
    }
}
";
    assert_eq!(
        ContainerDumper::new(&builder)
            .dump(&DumpOptions::default())
            .expect("dump"),
        expected
    );
}

#[test]
fn dumps_every_build_step() {
    let mut builder = ContainerBuilder::new();
    builder
        .register("foo", "FooClass")
        .set_constructor("getInstance")
        .set_shared(false)
        .set_file("%path%/foo.php")
        .add_argument("foo")
        .add_argument(Value::service("foo.baz"))
        .add_argument(Value::Map(
            [
                ("%foo%".to_string(), Value::from("foo is %foo%")),
                ("bar".to_string(), Value::from("%foo%")),
            ]
            .into_iter()
            .collect(),
        ))
        .add_argument(true)
        .add_argument(Value::service("service_container"))
        .add_method_call("setBar", vec![Value::service("bar")])
        .add_method_call("initialize", vec![])
        .set_configurator(Configurator::Function("sc_configure".into()));
    builder
        .register("bar", "FooClass")
        .add_argument("foo")
        .add_argument(Value::service("foo.baz"))
        .add_argument(Value::parameter("foo_bar"))
        .set_configurator(Configurator::Service {
            id: "foo.baz".into(),
            method: "configure".into(),
        });
    builder
        .register("foo.baz", "%baz_class%")
        .set_constructor("getInstance")
        .set_configurator(Configurator::Static {
            class: "%baz_class%".into(),
            method: "configureStatic1".into(),
        });
    builder
        .register("foo_bar", "FooClass")
        .add_method_call("setMissing", vec![Value::service("unknown")]);
    builder
        .register("factory", "Bar")
        .set_factory_service("foo_bar", "createBar")
        .add_argument(Value::Integer(1));
    builder.set_alias("alias_for_foo", "foo");

    let code = ContainerDumper::new(&builder)
        .dump(&DumpOptions::default())
        .expect("dump");
    let expected = r#"class ProjectServiceContainer extends ServiceContainer
{
    protected $shared = [];

    protected function getFooService()
    {
        require_once $this->getParameter('path').'/foo.php';

        $instance = call_user_func(['FooClass', 'getInstance'], 'foo', $this->getService('foo.baz'), ['%foo%' => 'foo is '.$this->getParameter('foo'), 'bar' => $this->getParameter('foo')], true, $this);
        $instance->setBar($this->getService('bar'));
        $instance->initialize();
        sc_configure($instance);

        return $instance;
    }

    protected function getBarService()
    {
        if (isset($this->shared['bar'])) {
            return $this->shared['bar'];
        }

        $instance = new FooClass('foo', $this->getService('foo.baz'), $this->getParameter('foo_bar'));
        $this->getService('foo.baz')->configure($instance);

        return $this->shared['bar'] = $instance;
    }

    protected function getFoo_BazService()
    {
        if (isset($this->shared['foo.baz'])) {
            return $this->shared['foo.baz'];
        }

        $instance = call_user_func([$this->getParameter('baz_class'), 'getInstance']);
        call_user_func([$this->getParameter('baz_class'), 'configureStatic1'], $instance);

        return $this->shared['foo.baz'] = $instance;
    }

    protected function getFooBarService()
    {
        if (isset($this->shared['foo_bar'])) {
            return $this->shared['foo_bar'];
        }

        $instance = new FooClass();
        $instance->setMissing(/* missing */ $this->getService('unknown'));

        return $this->shared['foo_bar'] = $instance;
    }

    protected function getFactoryService()
    {
        if (isset($this->shared['factory'])) {
            return $this->shared['factory'];
        }

        $instance = $this->getService('foo_bar')->createBar(1);

        return $this->shared['factory'] = $instance;
    }

    protected function getAliasForFooService()
    {
        return $this->getService('foo');
    }
}
"#;
    assert_eq!(code, expected);
}

#[test]
fn map_keys_are_not_interpolated() {
    // Keys are written as plain strings; only values are resolved.
    let mut builder = ContainerBuilder::new();
    builder.register("foo", "Foo").add_argument(Value::Map(
        [("%k%".to_string(), Value::from("v"))].into_iter().collect(),
    ));
    let code = ContainerDumper::new(&builder)
        .dump(&DumpOptions::default())
        .expect("dump");
    assert!(code.contains("new Foo(['%k%' => 'v'])"));
}

#[test]
fn dump_is_deterministic() {
    let temp = TempDir::new().expect("tmp");
    let path = temp.path().join("services.yml");
    fs::write(
        &path,
        "parameters:\n  mailer.class: Mailer\nservices:\n  z: { class: Z }\n  mailer: { class: '%mailer.class%', arguments: ['@z'] }\n  a: '@mailer'\n",
    )
    .expect("write");

    let dump = || {
        let mut builder = ContainerBuilder::new();
        ServicesLoader::new(&mut builder).load_file(&path).expect("load");
        ContainerDumper::new(&builder)
            .dump(&DumpOptions::default())
            .expect("dump")
    };
    let first = dump();
    assert_eq!(first, dump());
    let z = first.find("getZService").expect("z");
    let mailer = first.find("getMailerService").expect("mailer");
    let alias = first.find("getAService").expect("alias");
    assert!(z < mailer && mailer < alias);
    assert!(first.contains("        $class = $this->getParameter('mailer.class');\n        $instance = new $class($this->getService('z'));\n"));
}

#[test]
fn opaque_argument_produces_no_output() {
    let mut builder = ContainerBuilder::new();
    builder.register("foo", "FooClass").add_argument(Value::opaque("stdClass"));
    let err = ContainerDumper::new(&builder)
        .dump(&DumpOptions::default())
        .unwrap_err();
    assert_eq!(
        err,
        DumpError::Unrepresentable {
            location: "argument 0 of service \"foo\"".into(),
            type_name: "stdClass".into(),
        }
    );
}

#[test]
fn constructor_cycles_are_rejected_before_emission() {
    let mut builder = ContainerBuilder::new();
    builder.register("a", "A").add_argument(Value::service("b"));
    builder.register("b", "B").add_argument(Value::service("a"));
    let err = ContainerDumper::new(&builder)
        .dump(&DumpOptions::default())
        .unwrap_err();
    assert_eq!(err.to_string(), "circular reference detected: a -> b -> a");
}

#[test]
fn alias_replaces_a_definition_with_the_same_id() {
    let mut builder = ContainerBuilder::new();
    builder.register("mailer", "Mailer");
    builder.register("smtp", "Smtp");
    builder.set_alias("Mailer", "smtp");
    assert!(!builder.has_definition("mailer"));

    let code = ContainerDumper::new(&builder)
        .dump(&DumpOptions::default())
        .expect("dump");
    assert_eq!(code.matches("function getMailerService()").count(), 1);
    assert!(code.contains("        return $this->getService('smtp');\n"));
}

#[test]
fn later_file_can_turn_a_service_into_an_alias() {
    let temp = TempDir::new().expect("tmp");
    let base = temp.path().join("base.yml");
    let overlay = temp.path().join("overlay.yml");
    fs::write(&base, "services:\n  mailer:\n    class: Mailer\n  smtp:\n    class: Smtp\n")
        .expect("write");
    fs::write(&overlay, "services:\n  mailer: '@smtp'\n").expect("write");

    let mut builder = ContainerBuilder::new();
    let mut loader = ServicesLoader::new(&mut builder);
    loader.load_file(&base).expect("base");
    loader.load_file(&overlay).expect("overlay");

    assert_eq!(builder.definitions().keys().collect::<Vec<_>>(), vec!["smtp"]);
    assert_eq!(builder.aliases().get("mailer").map(String::as_str), Some("smtp"));
    let code = ContainerDumper::new(&builder)
        .dump(&DumpOptions::default())
        .expect("dump");
    assert_eq!(code.matches("function getMailerService()").count(), 1);
}

#[test]
fn ids_sharing_an_accessor_are_rejected() {
    let mut builder = ContainerBuilder::new();
    builder.register("foo_bar", "A");
    builder.register("foo-bar", "B");
    let err = ContainerDumper::new(&builder)
        .dump(&DumpOptions::default())
        .unwrap_err();
    assert_eq!(
        err,
        DumpError::AccessorCollision {
            first: "foo_bar".into(),
            second: "foo-bar".into(),
            accessor: "getFooBarService".into(),
        }
    );

    let mut builder = ContainerBuilder::new();
    builder.register("foobar", "A");
    builder.set_alias("foo.bar", "foobar");
    assert!(ContainerDumper::new(&builder).dump(&DumpOptions::default()).is_ok());
}
