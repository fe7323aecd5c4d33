/*!
  A human readable listing of a memory image. Because code and data are not distinguished,
  words that do not decode to an instruction, or instructions whose parameters would run past
  the end of the image, are listed as data.
*/

use super::Instruction;
use crate::Value;

pub fn disassemble(image: &[Value]) -> String {
  let mut listing = String::new();
  let mut address = 0;

  while address < image.len() {
    let word = image[address];
    match Instruction::decode(word, address) {

      Ok(instruction) if address + instruction.size() <= image.len() => {
        let parameters = &image[address + 1..address + instruction.size()];
        listing.push_str(&format!("{:>5}: {}\n", address, instruction.render(parameters)));
        address += instruction.size();
      }

      _ => {
        listing.push_str(&format!("{:>5}: data {}\n", address, word));
        address += 1;
      }

    }
  }

  listing
}
