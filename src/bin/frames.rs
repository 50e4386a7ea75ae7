use kvs_client::{CommandFactory, FactoryConfig, ScanParams, SetParams};

fn main() -> kvs_client::Result<()> {
    let factory = CommandFactory::with_config(FactoryConfig::default().key_prefix("demo:"));

    let set = factory.set_with::<String>("greeting", "hello world", &SetParams::new().nx().ex(60))?;
    let scan = factory.scan::<String>(&Default::default(), &ScanParams::new().match_pattern("demo:*"));
    let zadd = factory.zadd_many("board", [(1.5, "a"), (-3.0, "b")], None)?;

    for arguments in [set.arguments(), scan.arguments(), zadd.arguments()] {
        let frame = arguments.to_value();
        dbg!(&frame);
        println!("{:02x?}", &frame.encode()[..]);
    }
    Ok(())
}
