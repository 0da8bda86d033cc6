use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::panic;
use std::process;
use tacit::value::Value;
use tacit::{Error, Primitives, compile, run, syntax};

fn main() {
    let result = panic::catch_unwind(|| {
        run_repl();
    });

    if let Err(panic_info) = result {
        eprintln!("The REPL encountered an unexpected error and must exit.");

        if let Some(msg) = panic_info.downcast_ref::<&str>() {
            eprintln!("Error: {msg}");
        } else if let Some(msg) = panic_info.downcast_ref::<String>() {
            eprintln!("Error: {msg}");
        } else {
            eprintln!("Error: Unknown panic occurred");
        }

        process::exit(1);
    }
}

/// Top-level bindings carried from one line to the next
#[derive(Default)]
struct Session {
    names: Vec<String>,
    values: Vec<Value>,
}

impl Session {
    /// Compile `line` with the session's bindings as externals, run it, and
    /// keep every top-level binding it leaves behind
    fn eval(&mut self, line: &str, primitives: &Primitives, show_code: bool) -> Result<Value, Error> {
        let block = syntax::parse_program(line)?;
        if show_code {
            #[cfg(feature = "json")]
            println!("{}", tacit::json::to_json(&block)?);
        }
        let externals: Vec<&str> = self.names.iter().map(String::as_str).collect();
        let program = compile(&block, primitives, &externals)?;
        if show_code {
            print!("{program}");
        }
        let (value, frame) = run(&program, self.values.clone())?;

        let mut names = Vec::new();
        let mut values = Vec::new();
        for (name, slot) in program.globals() {
            // a name declared after a failing guard may never have been set
            if let Some(value) = frame.get(*slot) {
                names.push(name.clone());
                values.push(value);
            }
        }
        self.names = names;
        self.values = values;
        Ok(value)
    }
}

fn run_repl() {
    println!("Tacit array language");
    println!("Enter expressions like: +´ ↕10");
    println!("Type :help for more commands, or Ctrl+C to exit.");
    println!();

    let mut rl = DefaultEditor::new().expect("Could not initialize REPL");
    let primitives = Primitives::standard();
    let mut session = Session::default();
    let mut show_code = false;

    loop {
        match rl.readline("tacit> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                match line {
                    ":help" => {
                        print_help(&primitives);
                        continue;
                    }
                    ":env" => {
                        print_environment(&session);
                        continue;
                    }
                    ":code" => {
                        show_code = !show_code;
                        let state = if show_code { "on" } else { "off" };
                        println!("Showing AST and bytecode: {state}");
                        continue;
                    }
                    ":quit" | ":exit" => {
                        println!("Goodbye!");
                        break;
                    }
                    _ => {}
                }

                match session.eval(line, &primitives, show_code) {
                    Ok(value) => println!("{value}"),
                    Err(e) => println!("{}", e.render(line)),
                }
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

fn print_help(primitives: &Primitives) {
    println!("Commands:");
    println!("  :help  - Show this help message");
    println!("  :env   - Show the names defined so far");
    println!("  :code  - Toggle printing the AST (JSON) and bytecode of each line");
    println!("  :quit  - Exit the interpreter");
    println!("  :exit  - Exit the interpreter");
    println!();
    println!("Syntax:");
    println!("  1‿2‿3, ⟨1, 'a', \"text\"⟩     lists");
    println!("  a ← 1    define, once per name");
    println!("  a ↩ 2    assign, a +↩ 1 modify");
    println!("  {{𝕩 + 𝕨}}  function block; 𝕊 is the block itself");
    println!("  {{𝕩 > 0 ? 0 ⋄ 𝕩}}  guard: zero returns the fallback");
    println!("  Name     capitalised names are functions, lowercase names data");
    println!();
    println!("Primitives: {}", primitives.names().concat());
    println!("Modifiers:  ˙ ˜ ¨ ⌜ ˘ ´ ` ⁼   ∘ ○ ⌾ ⎉ ⊸ ⟜");
    println!();
}

fn print_environment(session: &Session) {
    if session.names.is_empty() {
        println!("No names defined.");
        return;
    }
    println!("Defined names ({} total):", session.names.len());
    for (name, value) in session.names.iter().zip(&session.values) {
        println!("  {name} = {value}");
    }
}
