#[macro_use]
extern crate log;

use std::io::{self, Read};
use std::process;

use clap::{crate_version, value_parser, Arg, ArgAction, ArgMatches, Command};
use log::LevelFilter;

use xmlrpc_stack::config::Config;
use xmlrpc_stack::error::Result;
use xmlrpc_stack::xmlrpc::{Client, Date, Fault, Server, Value};

fn cli() -> Command {
    Command::new("xrpc")
        .version(crate_version!())
        .about("XML-RPC toolbox: answer a request read from stdin, or call a remote method")
        .subcommand_required(true)
        .arg(Arg::new("verbose")
            .short('v')
            .long("verbose")
            .global(true)
            .action(ArgAction::SetTrue)
            .help("Verbose mode"))
        .subcommand(Command::new("serve")
            .about("Reads a methodCall from stdin and prints the response of the demo server")
            .arg(Arg::new("chunk-size")
                .long("chunk-size")
                .value_name("BYTES")
                .value_parser(value_parser!(usize))
                .help("Maximum number of bytes handed to the XML tokenizer at once")))
        .subcommand(Command::new("call")
            .about("Calls a remote method and prints the result")
            .arg(Arg::new("url").required(true).help("Endpoint, e.g. \"http://localhost:8080/RPC2\""))
            .arg(Arg::new("method").required(true).help("Remote method name"))
            .arg(Arg::new("args")
                .num_args(0..)
                .help("Arguments; booleans, integers and doubles are recognised, anything else is a string")))
}

fn main() {
    let matches = cli().get_matches();

    let mut config = Config::default();
    config.verbose = matches.get_flag("verbose");

    // Init logging to DEBUG only if user required it
    let mut logger = env_logger::Builder::from_default_env();
    if config.verbose {
        logger.filter_level(LevelFilter::Debug);
    }
    logger.init();

    let outcome = match matches.subcommand() {
        Some(("serve", sub)) => {
            if let Some(chunk_size) = sub.get_one::<usize>("chunk-size") {
                config.chunk_size = *chunk_size;
            }
            serve(&config)
        }
        Some(("call", sub)) => {
            config.url = sub.get_one::<String>("url").cloned();
            call(&config, sub)
        }
        _ => Ok(2),
    };

    match outcome {
        Ok(code) => process::exit(code),
        Err(err) => {
            error!("{}", err);
            process::exit(2);
        }
    }
}

fn serve(config: &Config) -> Result<i32> {
    let mut body = String::new();
    io::stdin().read_to_string(&mut body)?;
    debug!("Read {} bytes from stdin", body.len());

    let server = demo_server()?.with_chunk_size(config.chunk_size);
    println!("{}", server.serve(&body));
    Ok(0)
}

fn call(config: &Config, matches: &ArgMatches) -> Result<i32> {
    let url = config.url.as_ref().map(|s| s.as_str()).unwrap_or_default();
    let method = matches.get_one::<String>("method").map(|s| s.as_str()).unwrap_or_default();
    let args: Vec<Value> = matches
        .get_many::<String>("args")
        .map(|values| values.map(|arg| parse_literal(arg)).collect())
        .unwrap_or_default();
    debug!("Calling {} on {} with {} argument(s)", method, url, args.len());

    match Client::new(url).query(method, &args) {
        Ok(value) => {
            println!("{}", value);
            Ok(0)
        }
        Err(fault) => {
            eprintln!("{}", fault);
            Ok(1)
        }
    }
}

/// Reads a command line argument as the narrowest literal it spells.
fn parse_literal(arg: &str) -> Value {
    match arg {
        "true" => return Value::Boolean(true),
        "false" => return Value::Boolean(false),
        _ => {}
    }
    if let Ok(n) = arg.parse::<i32>() {
        return Value::Int(n);
    }
    match arg.parse::<f64>() {
        Ok(x) if x.is_finite() => Value::Double(x),
        _ => Value::String(arg.to_string()),
    }
}

fn demo_server() -> Result<Server> {
    let mut server = Server::introspection();

    server.add_function("demo_add", |args: &[Value]| {
        let sum = args.iter().take(2).filter_map(Value::as_i32).fold(0i32, |acc, n| acc.wrapping_add(n));
        Ok(Value::Int(sum))
    });
    server.add_function("demo_echo", |args: &[Value]| Ok(Value::Array(args.to_vec())));
    server.add_function("demo_time", |_: &[Value]| Ok(Value::DateTime(Date::now())));
    server.add_function("demo_fail", |args: &[Value]| {
        let code = args.first().and_then(Value::as_i32).unwrap_or(1);
        Err(Fault::new(code, "requested failure"))
    });

    server.add_callback("demo.add", "demo_add", &["int", "int", "int"], "Adds two integers")?;
    server.add_callback("demo.echo", "demo_echo", &["array"], "Returns its arguments as an array")?;
    server.add_callback("demo.time", "demo_time", &["dateTime.iso8601"], "Current server time in UTC")?;
    server.add_callback("demo.fail", "demo_fail", &["struct", "int?"], "Always answers with a fault")?;
    Ok(server)
}

#[cfg(test)]
mod tests {
    use super::*;
    use xmlrpc_stack::xmlrpc::Message;

    #[test]
    fn test_parse_literal() {
        assert_eq!(Value::Boolean(true), parse_literal("true"));
        assert_eq!(Value::Int(-7), parse_literal("-7"));
        assert_eq!(Value::Double(2.5), parse_literal("2.5"));
        assert_eq!(Value::Double(3000000000.0), parse_literal("3000000000"));
        assert_eq!(Value::String("inf".into()), parse_literal("inf"));
        assert_eq!(Value::String("hello world".into()), parse_literal("hello world"));
    }

    #[test]
    fn test_cli_arguments() {
        let matches = cli().try_get_matches_from(vec!["xrpc", "-v", "call", "http://localhost/RPC2", "demo.add", "1", "2"])
            .unwrap();
        assert!(matches.get_flag("verbose"));

        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!("call", name);
        let args: Vec<&str> = sub.get_many::<String>("args").unwrap().map(|s| s.as_str()).collect();
        assert_eq!(vec!["1", "2"], args);

        let matches = cli().try_get_matches_from(vec!["xrpc", "serve", "--chunk-size", "64"]).unwrap();
        let (_, sub) = matches.subcommand().unwrap();
        assert_eq!(Some(&64), sub.get_one::<usize>("chunk-size"));

        assert!(cli().try_get_matches_from(vec!["xrpc"]).is_err());
    }

    #[test]
    fn test_demo_server() {
        let server = demo_server().unwrap().with_chunk_size(16);
        let body = "<?xml version=\"1.0\"?><methodCall><methodName>demo.add</methodName><params>\
                    <param><value><int>20</int></value></param><param><value><int>22</int></value></param>\
                    </params></methodCall>";
        let response = Message::parse(&server.serve(body)).unwrap();
        assert_eq!(&[Value::Int(42)], response.params());

        let fault = server.call("demo.fail", &[Value::Int(12)]).unwrap_err();
        assert_eq!(12, fault.code());
        assert!(server.list_methods().starts_with(&["demo.fail".to_string()]));
    }
}
