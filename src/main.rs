use classasm::jvm::attributes::LineNumber;
use classasm::jvm::class_file::ClassFileBuilder;
use classasm::jvm::code::{InstructionEncoder, Opcode};
use classasm::jvm::*;

use clap::{value_t, App, Arg};

fn main() -> Result<(), Error> {
    env_logger::init();

    let matches = App::new("JVM class file assembler")
        .version("0.1.0")
        .author("Alec Theriault <alec.theriault@gmail.com>")
        .about("Assembles a class whose `main` method prints a message")
        .arg(
            Arg::with_name("output class")
                .long("output-class")
                .value_name("CLASS_NAME")
                .help("Binary name of the class to generate, eg. `me/Hello`")
                .required(true)
                .takes_value(true),
        )
        .arg(
            Arg::with_name("message")
                .long("message")
                .value_name("TEXT")
                .default_value("Hello, world!")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("major version")
                .long("major-version")
                .value_name("VERSION")
                .help("Class file major version (52 is Java 8)")
                .default_value("52")
                .takes_value(true),
        )
        .get_matches();

    let class_name = matches.value_of("output class").unwrap_or_default();
    let message = matches.value_of("message").unwrap_or_default();
    let major_version = value_t!(matches, "major version", u16).unwrap_or_else(|e| e.exit());
    let version = Version::new(major_version, 0);

    log::info!("Assembling '{}' for class file version {}", class_name, version);
    let mut class = ClassFileBuilder::new(
        version,
        ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
        class_name,
        Some("java/lang/Object"),
    )?;

    class.method(
        MethodAccessFlags::PUBLIC,
        "<init>",
        "()V",
        |attributes, pool| {
            let super_init = pool.get_method_ref("java/lang/Object", "<init>", "()V")?;
            let mut code = InstructionEncoder::new();
            code.op(Opcode::ALoad0)?;
            code.constant(Opcode::InvokeSpecial, super_init)?;
            code.op(Opcode::Return)?;
            attributes.code(pool, 1, 1, code.finish()?, |_, _| Ok(()))
        },
    )?;

    class.method(
        MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
        "main",
        "([Ljava/lang/String;)V",
        |attributes, pool| {
            let out = pool.get_field_ref("java/lang/System", "out", "Ljava/io/PrintStream;")?;
            let println =
                pool.get_method_ref("java/io/PrintStream", "println", "(Ljava/lang/String;)V")?;
            let message = pool.get_string(message)?;

            let mut code = InstructionEncoder::new();
            code.constant(Opcode::GetStatic, out)?;
            code.ldc(message)?;
            code.constant(Opcode::InvokeVirtual, println)?;
            code.op(Opcode::Return)?;
            attributes.code(pool, 2, 1, code.finish()?, |nested, pool| {
                let lines = vec![LineNumber {
                    start_pc: 0,
                    line_number: 1,
                }];
                nested.line_number_table(pool, lines)
            })
        },
    )?;

    let source_file = format!(
        "{}.java",
        class_name.rsplit('/').next().unwrap_or(class_name)
    );
    class.attributes(|attributes, pool| attributes.source_file(pool, &source_file))?;

    // Write out the results
    let class_file = format!("{}.class", class_name);
    log::info!("Writing '{}'", class_file);
    class.finish()?.save_to_path(&class_file, true)?;

    Ok(())
}
