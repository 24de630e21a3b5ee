use std::sync::Arc;

use tracing_subscriber::EnvFilter;
use wam_prove::{
    ast::{Literal, Rule, Term},
    compiler::Compiler,
    FactsPlugin, Machine, Plugin, Result, State,
};

const MAX_DEPTH: usize = 6;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    if let Err(err) = prove() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn prove() -> Result<()> {
    let c = Term::constant;
    let v = Term::var;

    let mut compiler = Compiler::new();
    for (parent, child) in [("tom", "bob"), ("bob", "ann"), ("bob", "pat")] {
        compiler.compile_rule(
            &Rule::fact(Literal::new("parent", vec![c(parent), c(child)]))
                .with_features(vec![Literal::new("db", vec![c("parent")])]),
        )?;
    }
    // grandparent(X, Z) :- parent(X, Y), parent(Y, Z) {gp(X)}.
    compiler.compile_rule(
        &Rule::new(
            Literal::new("grandparent", vec![v("X"), v("Z")]),
            vec![
                Literal::new("parent", vec![v("X"), v("Y")]),
                Literal::new("parent", vec![v("Y"), v("Z")]),
            ],
        )
        .with_features(vec![Literal::new("gp", vec![v("X")])]),
    )?;

    // ?- grandparent(tom, W), likes(W, What).
    let query = compiler.compile_query(&[
        Literal::new("grandparent", vec![c("tom"), v("W")]),
        Literal::new("likes", vec![v("W"), v("What")]),
    ]);

    let program = compiler.into_program();
    println!("program:");
    for (addr, instr) in program.instructions().iter().enumerate() {
        println!("{addr:4}: {instr}");
    }

    let mut likes = FactsPlugin::new();
    likes.add_fact("likes", &["ann", "cats"]);
    likes.add_fact("likes", &["pat", "dogs"]);
    let plugins: Vec<Arc<dyn Plugin>> = vec![Arc::new(likes)];

    let mut machine = Machine::new(Arc::new(program), plugins);
    machine.run(Some(query), true)?;
    let root = machine.save_state();

    println!("\nproof graph:");
    report(&mut machine, &root, 0)?;
    let mut frontier = vec![root];
    for depth in 1..=MAX_DEPTH {
        let mut next = Vec::new();
        for state in &frontier {
            for outlink in machine.outlinks(state, true)? {
                let mut features: Vec<String> = outlink
                    .features
                    .iter()
                    .flatten()
                    .map(|(goal, weight)| format!("{goal}={weight}"))
                    .collect();
                features.sort();
                println!("{:indent$}via [{}]", "", features.join(", "), indent = depth * 2);
                report(&mut machine, &outlink.state, depth)?;
                next.push(outlink.state);
            }
        }
        if next.is_empty() {
            break;
        }
        frontier = next;
    }
    Ok(())
}

fn report(machine: &mut Machine, state: &State, depth: usize) -> Result<()> {
    let pending: Vec<String> = if state.is_completed() {
        Vec::new()
    } else {
        machine
            .pending_goals(state)?
            .iter()
            .map(ToString::to_string)
            .collect()
    };
    println!(
        "{:indent$}{state} pending: [{}]",
        "",
        pending.join(", "),
        indent = depth * 2
    );
    Ok(())
}
