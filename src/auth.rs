use anyhow::{Result, bail};
use std::io::{self, BufRead, IsTerminal};
use zeroize::Zeroizing;

const PIN_ENV: &str = "PINSEAL_PIN";

pub fn read_pin() -> Result<Zeroizing<String>> {
    //  PINSEAL_PIN="1234" pinseal open
    if let Some(pin) = pin_from_env() {
        return Ok(pin);
    }

    //  echo "1234" | pinseal open
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_line(&mut buf)?;
        trim_newline(&mut buf);

        if !buf.is_empty() {
            return Ok(buf);
        }
    }

    if io::stdin().is_terminal() {
        let pin = Zeroizing::new(rpassword::prompt_password("PIN: ")?);
        if !pin.is_empty() {
            return Ok(pin);
        }
    }

    bail!("No PIN provided")
}

pub fn read_new_pin_with_confirmation() -> Result<Zeroizing<String>> {
    if let Some(pin) = pin_from_env() {
        return Ok(pin);
    }

    let (pin1, pin2) = if io::stdin().is_terminal() {
        (
            Zeroizing::new(rpassword::prompt_password("New PIN: ")?),
            Zeroizing::new(rpassword::prompt_password("Confirm PIN: ")?),
        )
    } else {
        let stdin = io::stdin();
        let mut handle = stdin.lock();

        let mut pin1 = Zeroizing::new(String::new());
        let mut pin2 = Zeroizing::new(String::new());

        handle.read_line(&mut pin1)?;
        handle.read_line(&mut pin2)?;

        trim_newline(&mut pin1);
        trim_newline(&mut pin2);
        (pin1, pin2)
    };

    if pin1.is_empty() {
        bail!("PIN cannot be empty");
    }

    if pin1 != pin2 {
        bail!("PINs do not match");
    }

    Ok(pin1)
}

fn pin_from_env() -> Option<Zeroizing<String>> {
    match std::env::var(PIN_ENV) {
        Ok(pin) if !pin.is_empty() => Some(Zeroizing::new(pin)),
        _ => None,
    }
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}
