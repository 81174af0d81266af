use mlp_machine::{Activation, MemoryStore, Mlp};
use ndarray::array;

fn main() -> mlp_machine::Result<()> {
    env_logger::init();

    let mut mlp = Mlp::new(&[2, 3, 1])?;
    mlp.set_hidden_activation(Activation::Identity);
    mlp.set_output_activation(Activation::Identity);
    mlp.set_weights(vec![
        array![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        array![[1.0], [1.0], [1.0]],
    ])?;

    let batch = array![[1.0, 2.0], [0.5, -0.5]];
    let out = mlp.forward(&batch)?;
    println!("forward({batch}) = {out}");

    let mut random = mlp.clone();
    random.set_hidden_activation(Activation::Tanh);
    random.randomize();

    let mut store = MemoryStore::new("demo");
    random.save(&mut store)?;

    #[cfg(feature = "serde")]
    {
        let json = store.to_json_string()?;
        let reloaded = MemoryStore::from_json_str("demo", &json)?;
        let copy = Mlp::load(&reloaded)?;
        println!(
            "json round-trip: {} bytes, identical = {}",
            json.len(),
            copy == random
        );
    }

    #[cfg(not(feature = "serde"))]
    println!("saved {} entries; enable the `serde` feature for JSON output", store.len());

    Ok(())
}
