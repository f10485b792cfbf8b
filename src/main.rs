use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;

use nqs_vmc::network::{Activation, FeedForward};
use nqs_vmc::operator::transverse_ising;
use nqs_vmc::optimize::VmcOptimizer;
use nqs_vmc::wavefunction::{Psi, WaveFunctionForm};
use nqs_vmc::{read_run_config, Result};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[arg(short, long, default_value = "config.yml")]
    config: String,
}

fn main() -> Result<()> {
    env_logger::init();

    // read the run configuration, with command line argument for the file name
    let args = Args::parse();
    let config = read_run_config(&args.config)?;

    let l = config.lattice_size;
    let form = config.form();
    let output_width = if config.autoregressive { 2 * l } else { 1 };
    let widths = [l, config.hidden_width, output_width];

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let real = FeedForward::random(&widths, Activation::Tanh, 0.3, &mut rng);
    let imag = if form == WaveFunctionForm::Real {
        None
    } else {
        Some(FeedForward::random(&widths, Activation::Tanh, 0.3, &mut rng))
    };
    let mut psi = Psi::new(real, imag, form, l, None, config.autoregressive)?;

    let hamiltonian =
        transverse_ising(l, config.field_b, config.coupling_j, config.boundary());

    println!("Transverse-field Ising ground state search");
    println!("------------------------------------------");
    println!("Lattice size:  {}", l);
    println!("Field b:       {}", config.field_b);
    println!("Coupling J:    {}", config.coupling_j);
    println!("Boundary:      {:?}", config.boundary());
    println!("Ansatz form:   {}", form.name());
    println!("Autoregressive: {}", config.autoregressive);
    println!();

    let optimizer = VmcOptimizer::new()
        .with_n_samples(config.n_samples)
        .with_max_iterations(config.iterations)
        .with_learning_rate(config.learning_rate)
        .with_update(config.update_rule());
    let optimizer = match config.seed {
        Some(seed) => optimizer.with_seed(seed),
        None => optimizer,
    };

    let results = optimizer.run(&mut psi, &hamiltonian)?;

    println!();
    println!("Energy trace (first/last 5 iterations):");
    let n = results.energy_history.len();
    for (i, e) in results.energy_history.iter().enumerate() {
        if i < 5 || i + 5 >= n {
            println!("  iter {:3}: E = {:10.5}", i + 1, e);
        } else if i == 5 {
            println!("  ...");
        }
    }

    Ok(())
}
